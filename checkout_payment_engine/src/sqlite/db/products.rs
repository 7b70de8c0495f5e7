use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product},
    traits::PaymentGatewayError,
};

/// Fetches the catalog rows for the given ids. Unknown ids are simply absent from the result.
pub async fn fetch_products(ids: &[String], conn: &mut SqliteConnection) -> Result<Vec<Product>, PaymentGatewayError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut in_clause = builder.separated(", ");
    for id in ids {
        in_clause.push_bind(id);
    }
    builder.push(")");
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, PaymentGatewayError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, price)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, price = excluded.price,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(product.id)
    .bind(product.name)
    .bind(product.price.value())
    .fetch_one(conn)
    .await?;
    Ok(product)
}
