#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use filtercrate::{ApiError, FindResult, OperationOptions, QueryParams, Resource};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use serde_json::{Value, json};

pub mod address_entity;
pub mod user_entity;

use address_entity::Addresses;
use user_entity::Users;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// `count` users named `user00`, `user01`, ... aged 20, 21, ...
pub async fn seed_users(db: &DatabaseConnection, count: usize) -> Value {
    let users: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "name": format!("user{i:02}"),
                "email": format!("user{i:02}@example.com"),
                "age": 20 + i,
            })
        })
        .collect();
    Users::create(db, Value::Array(users), Some(true))
        .await
        .expect("seeding users")
}

/// Three users; the first has two addresses, the second one, the third none.
pub async fn seed_users_with_addresses(db: &DatabaseConnection) {
    seed_users(db, 3).await;
    let addresses = json!([
        {"user_id": 1, "city": "Lausanne"},
        {"user_id": 1, "city": "Zurich"},
        {"user_id": 2, "city": "Geneva"},
    ]);
    Addresses::create(db, addresses, Some(true))
        .await
        .expect("seeding addresses");
}

async fn list_users(
    State(db): State<DatabaseConnection>,
    QueryParams(query): QueryParams,
) -> Result<Json<FindResult>, ApiError> {
    Ok(Json(Users::find(&db, query, OperationOptions::default()).await?))
}

async fn get_user(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    QueryParams(query): QueryParams,
) -> Result<Json<Value>, ApiError> {
    Users::get(&db, id.into(), query, OperationOptions::default())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", Some(id.to_string())))
}

async fn remove_user(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    QueryParams(query): QueryParams,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        Users::remove(&db, Some(id.into()), query, OperationOptions::default()).await?,
    ))
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let api = Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(remove_user))
        .with_state(db);

    Router::new().nest("/api/v1", api)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateUserTable), Box::new(CreateAddressTable)]
    }
}

pub struct CreateUserTable;

#[async_trait::async_trait]
impl MigrationName for CreateUserTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_user_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUserTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(UserEntity)
            .if_not_exists()
            .col(
                ColumnDef::new(UserColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(UserColumn::Name).string().not_null())
            .col(ColumnDef::new(UserColumn::Email).string().not_null())
            .col(ColumnDef::new(UserColumn::Age).integer().not_null())
            .col(
                ColumnDef::new(UserColumn::Deleted)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserEntity).to_owned())
            .await?;
        Ok(())
    }
}

pub struct CreateAddressTable;

#[async_trait::async_trait]
impl MigrationName for CreateAddressTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_address_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateAddressTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(AddressEntity)
            .if_not_exists()
            .col(
                ColumnDef::new(AddressColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(AddressColumn::UserId).integer().not_null())
            .col(ColumnDef::new(AddressColumn::City).string().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AddressEntity).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum UserColumn {
    Id,
    Name,
    Email,
    Age,
    Deleted,
}

impl Iden for UserColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::Name => "name",
                Self::Email => "email",
                Self::Age => "age",
                Self::Deleted => "deleted",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct UserEntity;

impl Iden for UserEntity {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "users").unwrap();
    }
}

#[derive(Debug)]
pub enum AddressColumn {
    Id,
    UserId,
    City,
}

impl Iden for AddressColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::UserId => "user_id",
                Self::City => "city",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct AddressEntity;

impl Iden for AddressEntity {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "addresses").unwrap();
    }
}
