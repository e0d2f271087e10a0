// src/services/address_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AddressRepository,
    models::customer::{Address, CreateAddressPayload},
};

#[derive(Clone)]
pub struct AddressService {
    pool: PgPool,
    address_repo: AddressRepository,
}

impl AddressService {
    pub fn new(pool: PgPool, address_repo: AddressRepository) -> Self {
        Self { pool, address_repo }
    }

    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<Address>, AppError> {
        self.address_repo.list(customer_id).await
    }

    /// O primeiro endereço do cliente vira o padrão automaticamente.
    pub async fn create(&self, customer_id: Uuid, payload: &CreateAddressPayload) -> Result<Address, AppError> {
        let mut tx = self.pool.begin().await?;

        let is_default =
            payload.is_default || self.address_repo.count(&mut *tx, customer_id).await? == 0;
        if is_default {
            self.address_repo.clear_default(&mut *tx, customer_id).await?;
        }
        let address = self
            .address_repo
            .create(&mut *tx, customer_id, payload, is_default)
            .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Troca o padrão na mesma transação: no máximo um endereço padrão por cliente.
    pub async fn set_default(&self, customer_id: Uuid, address_id: Uuid) -> Result<Address, AppError> {
        let mut tx = self.pool.begin().await?;

        self.address_repo
            .find(&mut *tx, customer_id, address_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("address".into()))?;

        self.address_repo.clear_default(&mut *tx, customer_id).await?;
        let address = self
            .address_repo
            .set_default(&mut *tx, customer_id, address_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("address".into()))?;

        tx.commit().await?;

        tracing::info!("🏠 Cliente {}: endereço padrão agora é {}", customer_id, address.id);
        Ok(address)
    }

    pub async fn delete(&self, customer_id: Uuid, address_id: Uuid) -> Result<(), AppError> {
        let deleted = self
            .address_repo
            .delete(&self.pool, customer_id, address_id)
            .await?;

        if !deleted {
            return Err(AppError::ResourceNotFound("address".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::customer::AddressType;

    async fn seed_customer(pool: &PgPool) -> Uuid {
        sqlx::query_scalar("INSERT INTO customers (name, phone) VALUES ('Sari', '081234567890') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn payload(label: &str, is_default: bool) -> CreateAddressPayload {
        CreateAddressPayload {
            label: label.into(),
            recipient_name: "Sari".into(),
            recipient_phone: "081234567890".into(),
            full_address: "Jl. Melati 5, Bandung".into(),
            latitude: None,
            longitude: None,
            address_type: AddressType::Home,
            is_default,
        }
    }

    #[sqlx::test]
    async fn first_address_becomes_default(pool: PgPool) {
        let customer_id = seed_customer(&pool).await;
        let service = AddressService::new(pool.clone(), AddressRepository::new(pool.clone()));

        let home = service.create(customer_id, &payload("Rumah", false)).await.unwrap();
        let office = service.create(customer_id, &payload("Kantor", false)).await.unwrap();

        assert!(home.is_default);
        assert!(!office.is_default);
    }

    #[sqlx::test]
    async fn switching_default_keeps_a_single_one(pool: PgPool) {
        let customer_id = seed_customer(&pool).await;
        let service = AddressService::new(pool.clone(), AddressRepository::new(pool.clone()));

        service.create(customer_id, &payload("Rumah", false)).await.unwrap();
        let office = service.create(customer_id, &payload("Kantor", false)).await.unwrap();

        let updated = service.set_default(customer_id, office.id).await.unwrap();
        assert!(updated.is_default);

        let defaults: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM addresses WHERE customer_id = $1 AND is_default",
        )
            .bind(customer_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(defaults, 1);
    }

    #[sqlx::test]
    async fn other_customers_address_is_not_found(pool: PgPool) {
        let owner = seed_customer(&pool).await;
        let stranger = seed_customer(&pool).await;
        let service = AddressService::new(pool.clone(), AddressRepository::new(pool.clone()));

        let address = service.create(owner, &payload("Rumah", true)).await.unwrap();

        let result = service.set_default(stranger, address.id).await;
        assert!(matches!(result, Err(AppError::ResourceNotFound(_))));
        assert!(matches!(
            service.delete(stranger, address.id).await,
            Err(AppError::ResourceNotFound(_))
        ));
    }
}
