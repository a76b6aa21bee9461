use bookstore_db::{Record, RowId, UniqueIndex};
use serde::{Deserialize, Deserializer, Serialize};

/// Language recorded when a create request leaves it out.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Longest ISBN accepted (ISBN-13 without separators).
pub const MAX_ISBN_LEN: usize = 13;

/// Longest title, author or publisher accepted.
pub const MAX_NAME_LEN: usize = 255;

/// Longest description accepted.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// A book in the catalog, in its transport shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Identifier assigned by the catalog
    pub id: RowId,
    pub title: String,
    pub author: String,
    /// Unique across the catalog
    pub isbn: String,
    pub publisher: Option<String>,
    /// Negative for BCE
    pub publication_year: Option<i32>,
    pub price: f64,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub language: String,
    pub page_count: Option<i32>,
    pub in_stock: bool,
}

/// Unique indexes kept on [`Book`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookIndex {
    Isbn,
}

impl UniqueIndex for BookIndex {
    fn name(self) -> &'static str {
        match self {
            BookIndex::Isbn => "isbn",
        }
    }
}

impl Record for Book {
    const TABLE: &'static str = "book";
    type Index = BookIndex;
    const UNIQUE_INDEXES: &'static [BookIndex] = &[BookIndex::Isbn];

    fn id(&self) -> RowId {
        self.id
    }

    fn set_id(&mut self, id: RowId) {
        self.id = id;
    }

    fn unique_key(&self, index: BookIndex) -> Option<String> {
        match index {
            BookIndex::Isbn => Some(self.isbn.clone()),
        }
    }
}

/// One rejected field in a create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub error: String,
}

impl FieldError {
    fn new(field: &'static str, error: impl Into<String>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }
}

/// Request model for creating a new book.
///
/// Every field is optional at the type level so that missing required
/// fields are reported together instead of failing on the first one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub page_count: Option<i32>,
    pub in_stock: Option<bool>,
}

impl CreateBook {
    /// Check required fields and field rules, producing an unsaved book with
    /// defaults applied. The returned book has id 0 until the catalog
    /// assigns one.
    pub fn validate(self) -> Result<Book, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = required_text("title", self.title, &mut errors);
        if let Some(title) = &title {
            check_len("title", title, MAX_NAME_LEN, &mut errors);
        }
        let author = required_text("author", self.author, &mut errors);
        if let Some(author) = &author {
            check_len("author", author, MAX_NAME_LEN, &mut errors);
        }
        let isbn = required_text("isbn", self.isbn, &mut errors);
        if let Some(isbn) = &isbn {
            check_isbn(isbn, &mut errors);
        }
        let price = match self.price {
            Some(price) => {
                check_price(price, &mut errors);
                Some(price)
            }
            None => {
                errors.push(FieldError::new("price", "price is required"));
                None
            }
        };
        if let Some(page_count) = self.page_count {
            check_page_count(page_count, &mut errors);
        }
        if let Some(publisher) = &self.publisher {
            check_len("publisher", publisher, MAX_NAME_LEN, &mut errors);
        }
        if let Some(description) = &self.description {
            check_len("description", description, MAX_DESCRIPTION_LEN, &mut errors);
        }

        match (title, author, isbn, price) {
            (Some(title), Some(author), Some(isbn), Some(price)) if errors.is_empty() => Ok(Book {
                id: 0,
                title,
                author,
                isbn,
                publisher: self.publisher,
                publication_year: self.publication_year,
                price,
                description: self.description,
                genre: self.genre,
                language: self
                    .language
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                page_count: self.page_count,
                in_stock: self.in_stock.unwrap_or(true),
            }),
            _ => Err(errors),
        }
    }
}

/// A field in a merge-patch: `None` when absent, `Some(None)` when sent as
/// `null`, `Some(Some(v))` when sent with a value.
pub type Patch<T> = Option<Option<T>>;

fn present<'de, D, T>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request model for a merge-patch update.
///
/// Absent fields keep their stored value. `null` clears an optional field
/// and is rejected for fields that must always hold a value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "present")]
    pub title: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub author: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub isbn: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub publisher: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub publication_year: Patch<i32>,
    #[serde(default, deserialize_with = "present")]
    pub price: Patch<f64>,
    #[serde(default, deserialize_with = "present")]
    pub description: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub genre: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub language: Patch<String>,
    #[serde(default, deserialize_with = "present")]
    pub page_count: Patch<i32>,
    #[serde(default, deserialize_with = "present")]
    pub in_stock: Patch<bool>,
}

impl UpdateBook {
    /// Check every supplied field. Absent fields are never an error.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
        ] {
            match value {
                Some(None) => errors.push(FieldError::new(field, format!("{field} cannot be null"))),
                Some(Some(text)) if text.trim().is_empty() => {
                    errors.push(FieldError::new(field, format!("{field} cannot be blank")))
                }
                Some(Some(text)) if field != "isbn" => {
                    check_len(field, text, MAX_NAME_LEN, &mut errors)
                }
                _ => {}
            }
        }
        if let Some(Some(isbn)) = &self.isbn {
            check_isbn(isbn, &mut errors);
        }

        match self.price {
            Some(None) => errors.push(FieldError::new("price", "price cannot be null")),
            Some(Some(price)) => check_price(price, &mut errors),
            None => {}
        }
        if matches!(self.language, Some(None)) {
            errors.push(FieldError::new("language", "language cannot be null"));
        }
        if matches!(self.in_stock, Some(None)) {
            errors.push(FieldError::new("in_stock", "in_stock cannot be null"));
        }
        if let Some(Some(page_count)) = self.page_count {
            check_page_count(page_count, &mut errors);
        }
        if let Some(Some(publisher)) = &self.publisher {
            check_len("publisher", publisher, MAX_NAME_LEN, &mut errors);
        }
        if let Some(Some(description)) = &self.description {
            check_len("description", description, MAX_DESCRIPTION_LEN, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Overwrite the fields present in this patch. Call [`UpdateBook::validate`]
    /// first: a `null` on a non-nullable field is skipped here.
    pub fn apply(self, book: &mut Book) {
        if let Some(Some(title)) = self.title {
            book.title = title;
        }
        if let Some(Some(author)) = self.author {
            book.author = author;
        }
        if let Some(Some(isbn)) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(publisher) = self.publisher {
            book.publisher = publisher;
        }
        if let Some(publication_year) = self.publication_year {
            book.publication_year = publication_year;
        }
        if let Some(Some(price)) = self.price {
            book.price = price;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(Some(language)) = self.language {
            book.language = language;
        }
        if let Some(page_count) = self.page_count {
            book.page_count = page_count;
        }
        if let Some(Some(in_stock)) = self.in_stock {
            book.in_stock = in_stock;
        }
    }
}

/// Confirmation returned by a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: RowId,
}

#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct GenreQuery {
    pub genre: String,
}

fn required_text(
    field: &'static str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => {
            errors.push(FieldError::new(field, format!("{field} is required")));
            None
        }
        Some(text) if text.trim().is_empty() => {
            errors.push(FieldError::new(field, format!("{field} cannot be blank")));
            None
        }
        Some(text) => Some(text),
    }
}

fn check_len(field: &'static str, value: &str, max: usize, errors: &mut Vec<FieldError>) {
    if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("{field} cannot exceed {max} characters"),
        ));
    }
}

fn check_isbn(isbn: &str, errors: &mut Vec<FieldError>) {
    if isbn.chars().count() > MAX_ISBN_LEN {
        errors.push(FieldError::new(
            "isbn",
            format!("isbn cannot exceed {MAX_ISBN_LEN} characters"),
        ));
    }
}

fn check_price(price: f64, errors: &mut Vec<FieldError>) {
    if !price.is_finite() || price <= 0.0 {
        errors.push(FieldError::new("price", "price must be greater than 0"));
    }
}

fn check_page_count(page_count: i32, errors: &mut Vec<FieldError>) {
    if page_count < 0 {
        errors.push(FieldError::new("page_count", "page_count cannot be negative"));
    }
}
