//! Book catalog service

use uuid::Uuid;
use validator::Validate;

use super::page_request;
use crate::{
    error::{AppError, AppResult},
    filter::FilterGrammar,
    models::{
        book::{Book, CreateBook, UpdateBook},
        stock::BookStock,
        ListQuery, Paginated,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    grammar: FilterGrammar,
}

impl BooksService {
    pub fn new(repository: Repository, grammar: FilterGrammar) -> Self {
        Self { repository, grammar }
    }

    pub async fn create(&self, request: CreateBook) -> AppResult<Book> {
        request.validate()?;
        let book = self.repository.books.create(&request).await?;
        tracing::info!("Book {} created: {}", book.id, book.title);
        Ok(book)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.repository.books.find_by_id(id).await
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<Paginated<Book>> {
        let request = page_request::<Book>(&self.grammar, query, false)?;
        let (rows, total) = self.repository.books.find_all(&request).await?;
        Ok(Paginated::new("Books retrieved successfully", &request, rows, total))
    }

    pub async fn update(&self, id: Uuid, request: UpdateBook) -> AppResult<Book> {
        request.validate()?;
        self.repository.books.update(id, &request).await
    }

    /// Delete a book that owns no stock copies
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.find_by_id(id).await?;
        if !self.repository.stocks.find_by_book_id(id).await?.is_empty() {
            return Err(AppError::PreconditionFailed(
                "book still has stock copies".to_string(),
            ));
        }
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    pub async fn stocks(&self, id: Uuid) -> AppResult<Vec<BookStock>> {
        self.repository.books.find_by_id(id).await?;
        self.repository.stocks.find_by_book_id(id).await
    }

    pub async fn available_stocks(&self, id: Uuid) -> AppResult<Vec<BookStock>> {
        self.repository.books.find_by_id(id).await?;
        self.repository.stocks.find_available_by_book_id(id).await
    }
}
