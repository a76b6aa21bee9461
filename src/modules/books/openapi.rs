//! OpenAPI fragment describing the `/api/books` surface.
//!
//! Shared by the store-backed module and the proxy, which expose the same
//! contract.

use serde_json::{json, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn book_list_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Book" }
                }
            }
        }
    })
}

fn path_param(name: &str, schema_type: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": schema_type }
    })
}

fn search(field: &str) -> Value {
    json!({
        "get": {
            "summary": format!("Search books by {field}"),
            "description": format!("Case-insensitive substring match on {field}"),
            "tags": ["Books"],
            "parameters": [{
                "name": field,
                "in": "query",
                "required": true,
                "schema": { "type": "string" }
            }],
            "responses": {
                "200": book_list_response("Matching books in insertion order"),
                "400": error_response("Missing query parameter")
            }
        }
    })
}

fn book_properties(with_id: bool) -> Value {
    let mut properties = json!({
        "title": { "type": "string", "maxLength": 255 },
        "author": { "type": "string", "maxLength": 255 },
        "isbn": { "type": "string", "maxLength": 13 },
        "publisher": { "type": "string", "nullable": true, "maxLength": 255 },
        "publication_year": {
            "type": "integer",
            "nullable": true,
            "description": "Negative for BCE"
        },
        "price": { "type": "number", "exclusiveMinimum": true, "minimum": 0 },
        "description": { "type": "string", "nullable": true, "maxLength": 5000 },
        "genre": { "type": "string", "nullable": true },
        "language": { "type": "string", "default": "English" },
        "page_count": { "type": "integer", "nullable": true, "minimum": 0 },
        "in_stock": { "type": "boolean", "default": true }
    });
    if with_id {
        properties["id"] = json!({
            "type": "integer",
            "format": "int64",
            "description": "Identifier assigned by the catalog"
        });
    }
    properties
}

/// Paths (relative to the module mount) and schemas for the books API.
pub fn fragment() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": book_list_response("All books in insertion order")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Book created"),
                        "400": error_response("Invalid input data"),
                        "409": error_response("ISBN already exists")
                    }
                }
            },
            "/{id}": {
                "parameters": [path_param("id", "integer", "Book id")],
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "description": "Merge-patch: only supplied fields change; null clears an optional field",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Book updated"),
                        "400": error_response("Invalid input data"),
                        "404": error_response("Book not found"),
                        "409": error_response("ISBN already exists")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Book deleted",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/DeleteResponse" }
                                }
                            }
                        },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/isbn/{isbn}": {
                "parameters": [path_param("isbn", "string", "Book ISBN")],
                "get": {
                    "summary": "Get a book by ISBN",
                    "tags": ["Books"],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/search/author": search("author"),
            "/search/title": search("title"),
            "/search/genre": search("genre")
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": book_properties(true),
                    "required": [
                        "id", "title", "author", "isbn", "price", "language", "in_stock"
                    ]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": book_properties(false),
                    "required": ["title", "author", "isbn", "price"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": book_properties(false)
                },
                "DeleteResponse": {
                    "type": "object",
                    "properties": {
                        "deleted": { "type": "boolean" },
                        "id": { "type": "integer", "format": "int64" }
                    },
                    "required": ["deleted", "id"]
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_covers_every_route() {
        let spec = fragment();
        let paths = spec["paths"].as_object().unwrap();
        for path in [
            "/",
            "/{id}",
            "/isbn/{isbn}",
            "/search/author",
            "/search/title",
            "/search/genre",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(spec["paths"]["/{id}"]["put"].is_object());
        assert!(spec["components"]["schemas"]["Book"]["properties"]["id"].is_object());
        assert!(spec["components"]["schemas"]["CreateBook"]["properties"]["id"].is_null());
    }
}
