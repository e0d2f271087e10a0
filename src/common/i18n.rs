// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

pub const DEFAULT_LANG: &str = "id";

// Catálogos embutidos no binário; a chave é "area.mensagem".
const CATALOGS: &[(&str, &str)] = &[
    ("id", include_str!("../../locales/id.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensagens traduzidas por idioma. Clonar é barato (Arc).
#[derive(Clone, Debug)]
pub struct I18nStore {
    messages: Arc<HashMap<String, HashMap<String, String>>>,
}

impl I18nStore {
    pub fn embedded() -> Self {
        let mut messages = HashMap::new();
        for (lang, raw) in CATALOGS {
            match serde_json::from_str::<HashMap<String, String>>(raw) {
                Ok(catalog) => {
                    messages.insert(lang.to_string(), catalog);
                }
                Err(e) => tracing::error!("Catálogo de idioma '{}' inválido: {}", lang, e),
            }
        }
        Self { messages: Arc::new(messages) }
    }

    /// Busca a mensagem no idioma pedido, cai para o padrão e por último devolve a própria chave.
    /// Os parâmetros substituem os marcadores `{nome}`.
    pub fn translate(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let template = self
            .messages
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string());

        args.iter().fold(template, |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_indonesian() {
        let store = I18nStore::embedded();
        assert_eq!(store.translate("fr", "orders.cart_empty", &[]), "Keranjang belanja kosong.");
    }

    #[test]
    fn substitutes_named_arguments() {
        let store = I18nStore::embedded();
        let msg = store.translate("en", "orders.insufficient_stock", &[("product", "Salmon")]);
        assert_eq!(msg, "Not enough stock for Salmon.");
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        let store = I18nStore::embedded();
        assert_eq!(store.translate("id", "nope.missing", &[]), "nope.missing");
    }
}
