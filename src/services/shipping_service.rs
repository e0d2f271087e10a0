// src/services/shipping_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::shipping::{FeeBand, GeoPoint, ShippingConfig, ShippingQuote},
};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Resolve um endereço livre em coordenadas. `Ok(None)` = nenhum resultado.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, AppError>;
}

// --- Nominatim (OpenStreetMap) ---

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, base_url: String, user_agent: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, AppError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("q", address), ("format", "json"), ("limit", "1"), ("countrycodes", "id")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
            (Ok(latitude), Ok(longitude)) => Ok(Some(GeoPoint { latitude, longitude })),
            _ => {
                tracing::warn!("⚠️ Geocoder devolveu coordenadas ilegíveis: {:?}", place);
                Ok(None)
            }
        }
    }
}

// --- Cálculo puro ---

/// Distância em linha reta (haversine), em km.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

/// Primeira faixa que cobre a distância; além da última faixa, vale a última.
pub fn fee_for_distance(bands: &[FeeBand], distance_km: f64) -> Decimal {
    bands
        .iter()
        .find(|band| distance_km <= band.up_to_km)
        .or_else(|| bands.last())
        .map(|band| band.fee)
        .unwrap_or(Decimal::ZERO)
}

/// Raio e faixa usam a distância bruta; o arredondamento é só para exibição.
pub fn quote(raw_distance_km: f64, config: &ShippingConfig, subtotal: Decimal) -> ShippingQuote {
    let distance_km = round_km(raw_distance_km);

    if raw_distance_km > config.max_radius_km {
        return ShippingQuote::OutOfRange {
            distance_km,
            max_radius_km: config.max_radius_km,
        };
    }

    let is_free_shipping = config
        .free_shipping_min_subtotal
        .is_some_and(|min| subtotal >= min);

    let fee = if is_free_shipping {
        Decimal::ZERO
    } else {
        fee_for_distance(&config.fee_bands, raw_distance_km)
    };

    ShippingQuote::Deliverable {
        fee,
        distance_km,
        is_free_shipping,
    }
}

// --- Serviço ---

#[derive(Clone)]
pub struct ShippingService {
    settings_repo: SettingsRepository,
    geocoder: Arc<dyn Geocoder>,
}

impl ShippingService {
    pub fn new(settings_repo: SettingsRepository, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { settings_repo, geocoder }
    }

    /// Qualquer falha do provedor vira "endereço não encontrado" para o cliente.
    pub async fn geocode(&self, address: &str) -> Result<GeoPoint, AppError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AppError::AddressNotFound);
        }

        match self.geocoder.geocode(address).await {
            Ok(Some(point)) => Ok(point),
            Ok(None) => Err(AppError::AddressNotFound),
            Err(e) => {
                tracing::warn!("⚠️ Falha no geocoding de '{}': {}", address, e);
                Err(AppError::AddressNotFound)
            }
        }
    }

    pub async fn calculate(&self, destination: GeoPoint, subtotal: Decimal) -> Result<ShippingQuote, AppError> {
        let settings = self.settings_repo.get_store_settings().await?.ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!(
                "store_settings sem origem cadastrada; frete indisponível"
            ))
        })?;

        let distance = haversine_km(settings.origin, destination);
        let result = quote(distance, &settings.shipping, subtotal);

        tracing::debug!("🚚 Frete calculado: {:?}", result);
        Ok(result)
    }

    /// Geocoding + cálculo numa chamada só.
    pub async fn estimate(&self, address: &str, subtotal: Decimal) -> Result<ShippingQuote, AppError> {
        let destination = self.geocode(address).await?;
        self.calculate(destination, subtotal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn config() -> ShippingConfig {
        ShippingConfig::default()
    }

    #[test]
    fn haversine_one_degree_of_latitude() {
        let a = GeoPoint { latitude: 0.0, longitude: 0.0 };
        let b = GeoPoint { latitude: 1.0, longitude: 0.0 };
        let d = haversine_km(a, b);
        assert!((d - 111.19).abs() < 0.01, "distância inesperada: {}", d);
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let p = GeoPoint { latitude: -6.2, longitude: 106.8 };
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn picks_first_band_covering_distance() {
        let bands = config().fee_bands;
        assert_eq!(fee_for_distance(&bands, 0.5), Decimal::from(5_000));
        assert_eq!(fee_for_distance(&bands, 3.0), Decimal::from(5_000));
        assert_eq!(fee_for_distance(&bands, 3.01), Decimal::from(10_000));
        assert_eq!(fee_for_distance(&bands, 14.0), Decimal::from(15_000));
    }

    #[test]
    fn beyond_last_band_uses_last_band() {
        let bands = vec![FeeBand { up_to_km: 5.0, fee: Decimal::from(8_000) }];
        assert_eq!(fee_for_distance(&bands, 9.0), Decimal::from(8_000));
        assert_eq!(fee_for_distance(&[], 9.0), Decimal::ZERO);
    }

    #[test]
    fn out_of_range_carries_no_fee() {
        // 40 km com raio máximo de 15 km
        let q = quote(40.0, &config(), Decimal::from(100_000));
        assert_eq!(
            q,
            ShippingQuote::OutOfRange { distance_km: 40.0, max_radius_km: 15.0 }
        );
    }

    #[test]
    fn free_shipping_above_threshold() {
        let q = quote(6.0, &config(), Decimal::from(300_000));
        assert_eq!(
            q,
            ShippingQuote::Deliverable {
                fee: Decimal::ZERO,
                distance_km: 6.0,
                is_free_shipping: true,
            }
        );

        let q = quote(6.0, &config(), Decimal::from(299_999));
        assert_eq!(
            q,
            ShippingQuote::Deliverable {
                fee: Decimal::from(10_000),
                distance_km: 6.0,
                is_free_shipping: false,
            }
        );
    }

    #[test]
    fn just_past_the_radius_is_out_of_range() {
        // 15,004 km arredonda para 15,00 mas continua fora do raio de 15 km
        match quote(15.004, &ShippingConfig::default(), Decimal::ZERO) {
            ShippingQuote::OutOfRange { distance_km, max_radius_km } => {
                assert_eq!(distance_km, 15.0);
                assert_eq!(max_radius_km, 15.0);
            }
            other => panic!("esperava fora de alcance, veio {:?}", other),
        }
    }

    #[test]
    fn band_edge_uses_raw_distance() {
        // 3,004 km já passou da faixa de 3 km
        match quote(3.004, &ShippingConfig::default(), Decimal::ZERO) {
            ShippingQuote::Deliverable { fee, .. } => assert_eq!(fee, Decimal::from(10_000)),
            other => panic!("esperava entrega, veio {:?}", other),
        }
    }

    #[test]
    fn distance_is_rounded_to_two_decimals() {
        let q = quote(2.34567, &config(), Decimal::ZERO);
        match q {
            ShippingQuote::Deliverable { distance_km, .. } => assert_eq!(distance_km, 2.35),
            other => panic!("esperava entrega, veio {:?}", other),
        }
    }

    fn geocoder_for(server: &MockServer) -> NominatimGeocoder {
        let client = Client::builder().timeout(Duration::from_secs(2)).build().unwrap();
        NominatimGeocoder::new(client, format!("{}/", server.uri()), "protein-store-test".into())
    }

    #[tokio::test]
    async fn nominatim_parses_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Jl. Sudirman 1, Jakarta"))
            .and(query_param("format", "json"))
            .and(header("user-agent", "protein-store-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "lat": "-6.2088", "lon": "106.8456", "display_name": "Jakarta" },
                { "lat": "0", "lon": "0" }
            ])))
            .mount(&server)
            .await;

        let point = geocoder_for(&server)
            .geocode("Jl. Sudirman 1, Jakarta")
            .await
            .unwrap();

        assert_eq!(point, Some(GeoPoint { latitude: -6.2088, longitude: 106.8456 }));
    }

    #[tokio::test]
    async fn nominatim_empty_result_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let point = geocoder_for(&server).geocode("alamat ngawur").await.unwrap();
        assert_eq!(point, None);
    }

    #[tokio::test]
    async fn nominatim_server_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = geocoder_for(&server).geocode("Jl. Thamrin").await;
        assert!(matches!(result, Err(AppError::HttpClientError(_))));
    }
}
