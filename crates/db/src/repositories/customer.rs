use sqlx::Row;
use uuid::Uuid;

use vendo_core::domain::customer::{Customer, CustomerDraft, CustomerId};

use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn customer_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id = Uuid::parse_str(&row.get::<String, _>("id"))
        .map_err(|error| RepositoryError::Decode(format!("invalid customer id: {error}")))?;
    Ok(Customer {
        id: CustomerId(id),
        name: row.get::<String, _>("name"),
        email: row.get::<String, _>("email"),
        phone: row.get::<String, _>("phone"),
        address: row.get::<String, _>("address"),
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address FROM customers WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    /// Upsert keyed by email: a returning customer keeps their id, the
    /// remaining fields take the freshly collected values.
    async fn create_or_update(&self, draft: &CustomerDraft) -> Result<Customer, RepositoryError> {
        let id = match self.find_by_email(&draft.email).await? {
            Some(existing) => existing.id,
            None => CustomerId(Uuid::new_v4()),
        };

        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, address)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (email) DO UPDATE SET
                 name = excluded.name,
                 phone = excluded.phone,
                 address = excluded.address,
                 updated_at = datetime('now')",
        )
        .bind(id.0.to_string())
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.address)
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            address: draft.address.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use vendo_core::domain::customer::CustomerDraft;

    use crate::migrations::run_pending;
    use crate::test_pool;
    use crate::repositories::{CustomerRepository, SqlCustomerRepository};

    fn draft(name: &str) -> CustomerDraft {
        CustomerDraft {
            name: name.to_string(),
            email: "ana@example.com".to_string(),
            phone: "612345678".to_string(),
            address: "Calle Mayor 10, Madrid".to_string(),
        }
    }

    async fn repository() -> SqlCustomerRepository {
        let pool = test_pool("sqlite::memory:").await;
        run_pending(&pool).await.expect("migrate");
        SqlCustomerRepository::new(pool)
    }

    #[tokio::test]
    async fn create_then_find_by_email() {
        let repository = repository().await;
        let created = repository.create_or_update(&draft("Ana Pérez")).await.expect("create");

        let found = repository
            .find_by_email("ana@example.com")
            .await
            .expect("query")
            .expect("present");
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn update_keeps_the_customer_id() {
        let repository = repository().await;
        let created = repository.create_or_update(&draft("Ana Pérez")).await.expect("create");
        let updated =
            repository.create_or_update(&draft("Ana P. García")).await.expect("update");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Ana P. García");
    }

    #[tokio::test]
    async fn unknown_email_yields_none() {
        let repository = repository().await;
        let found = repository.find_by_email("nadie@example.com").await.expect("query");
        assert!(found.is_none());
    }
}
