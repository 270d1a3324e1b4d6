//! Customer management service

use uuid::Uuid;
use validator::Validate;

use super::page_request;
use crate::{
    error::{AppError, AppResult},
    filter::FilterGrammar,
    models::{
        customer::{CreateCustomer, Customer, CustomerWithTransactions, UpdateCustomer},
        ListQuery, Paginated,
    },
    repository::{optional, Repository},
};

#[derive(Clone)]
pub struct CustomersService {
    repository: Repository,
    grammar: FilterGrammar,
}

impl CustomersService {
    pub fn new(repository: Repository, grammar: FilterGrammar) -> Self {
        Self { repository, grammar }
    }

    pub async fn create(&self, request: CreateCustomer) -> AppResult<Customer> {
        request.validate()?;
        if optional(self.repository.customers.find_by_code(&request.code).await)?.is_some() {
            return Err(AppError::Conflict(format!("customer {} already exists", request.code)));
        }
        let customer = self.repository.customers.create(&request).await?;
        tracing::info!("Customer {} created ({})", customer.id, customer.code);
        Ok(customer)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Customer> {
        self.repository.customers.find_by_id(id).await
    }

    pub async fn get_by_code(&self, code: &str) -> AppResult<Customer> {
        self.repository.customers.find_by_code(code).await
    }

    pub async fn get_with_transactions(&self, id: Uuid) -> AppResult<CustomerWithTransactions> {
        let customer = self.repository.customers.find_by_id(id).await?;
        let transactions = self.repository.transactions.find_by_customer_id(id).await?;
        Ok(CustomerWithTransactions {
            customer,
            transactions,
        })
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<Paginated<Customer>> {
        let request = page_request::<Customer>(&self.grammar, query, false)?;
        let (rows, total) = self.repository.customers.find_all(&request).await?;
        Ok(Paginated::new("Customers retrieved successfully", &request, rows, total))
    }

    pub async fn update(&self, id: Uuid, request: UpdateCustomer) -> AppResult<Customer> {
        request.validate()?;
        self.repository.customers.update(id, &request).await
    }

    /// Delete a customer with no borrowing history
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.customers.find_by_id(id).await?;
        if !self.repository.transactions.find_by_customer_id(id).await?.is_empty() {
            return Err(AppError::PreconditionFailed(
                "customer has book transactions".to_string(),
            ));
        }
        self.repository.customers.delete(id).await?;
        tracing::info!("Customer {} deleted", id);
        Ok(())
    }
}
