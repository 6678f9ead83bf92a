#![allow(dead_code)]

use axum::Router;
use furetui_crud::space::entity::{menu_resource, menu_root, space};
use furetui_crud::{CrudState, Registry, Row};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::prelude::*;

pub mod entities;

use entities::customer::{self, Customer};
use entities::invoice::{self, Invoice};

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("furetui_crud=debug")
        .with_test_writer()
        .try_init();

    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn registry() -> Registry {
    furetui_crud::space::register(Registry::new().register::<Customer>().register::<Invoice>())
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    furetui_crud::router(CrudState::new(db, registry()))
}

/// Build a JSON object from a `json!` literal
pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("JSON object")
}

/// Customers:
///
/// | id | name | city | vip |
/// |---|---|---|---|
/// | 1 | Alice | Paris | yes |
/// | 2 | Bob | Lyon | no |
/// | 3 | Carol | Paris | yes |
/// | 4 | Dave | | no |
///
/// Invoices: 1 and 2 for Alice, 3 for Carol, 4 without customer.
pub async fn seed_customers(db: &DatabaseConnection) -> Result<(), DbErr> {
    let customers = [
        (1, "Alice", Some("Paris"), true),
        (2, "Bob", Some("Lyon"), false),
        (3, "Carol", Some("Paris"), true),
        (4, "Dave", None, false),
    ];
    for (id, name, city, vip) in customers {
        customer::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            city: Set(city.map(str::to_string)),
            vip: Set(vip),
        }
        .insert(db)
        .await?;
    }

    let invoices = [(1, Some(1), 100), (2, Some(1), 250), (3, Some(3), 75), (4, None, 10)];
    for (id, customer_id, amount) in invoices {
        invoice::ActiveModel {
            id: Set(id),
            customer_id: Set(customer_id),
            amount: Set(amount),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Spaces `sales` (order 10), `hr` (order 20) and `empty` (order 100).
///
/// `sales`: root 1 "Sales" (order 10) with resources 1 (default) and 2,
/// root 2 without label (order 20) with resource 3, root 3 "Archive"
/// (order 30) without resources.
///
/// `hr`: root 4 "HR" with resources 4 (order 1) and 5 (order 3).
pub async fn seed_spaces(db: &DatabaseConnection) -> Result<(), DbErr> {
    let spaces = [
        ("sales", "Sales", 10),
        ("hr", "Human resources", 20),
        ("empty", "Empty", 100),
    ];
    for (code, label, order) in spaces {
        space::ActiveModel {
            code: Set(code.to_string()),
            label: Set(label.to_string()),
            order: Set(order),
            description: Set(None),
            icon_code: Set(None),
            icon_type: Set(None),
        }
        .insert(db)
        .await?;
    }

    let roots = [
        (1, "sales", Some("Sales"), 10),
        (2, "sales", None, 20),
        (3, "sales", Some("Archive"), 30),
        (4, "hr", Some("HR"), 10),
    ];
    for (id, space_code, label, order) in roots {
        menu_root::ActiveModel {
            id: Set(id),
            space_code: Set(space_code.to_string()),
            label: Set(label.map(str::to_string)),
            order: Set(order),
            icon_code: Set(None),
            icon_type: Set(None),
        }
        .insert(db)
        .await?;
    }

    let resources = [
        (1, 1, Some(11), "Orders", 1, true),
        (2, 1, Some(12), "Quotations", 2, false),
        (3, 2, Some(13), "Customers", 5, false),
        (4, 4, None, "Employees", 1, false),
        (5, 4, Some(15), "Leaves", 3, false),
    ];
    for (id, root_id, resource_id, label, order, is_default) in resources {
        menu_resource::ActiveModel {
            id: Set(id),
            root_id: Set(root_id),
            resource_id: Set(resource_id),
            label: Set(label.to_string()),
            order: Set(order),
            is_default: Set(is_default),
            icon_code: Set(None),
            icon_type: Set(None),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateCustomerTables), Box::new(CreateSpaceTables)]
    }
}

pub struct CreateCustomerTables;

#[async_trait::async_trait]
impl MigrationName for CreateCustomerTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_customer_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCustomerTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomerTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomerTable::Name).string().not_null())
                    .col(ColumnDef::new(CustomerTable::City).string().null())
                    .col(
                        ColumnDef::new(CustomerTable::Vip)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InvoiceTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceTable::CustomerId).integer().null())
                    .col(ColumnDef::new(InvoiceTable::Amount).integer().not_null())
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvoiceTable::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CustomerTable::Table).to_owned())
            .await?;
        Ok(())
    }
}

pub struct CreateSpaceTables;

#[async_trait::async_trait]
impl MigrationName for CreateSpaceTables {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_space_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateSpaceTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpaceTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SpaceTable::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SpaceTable::Label).string().not_null())
                    .col(
                        ColumnDef::new(SpaceTable::Order)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(ColumnDef::new(SpaceTable::Description).string().null())
                    .col(ColumnDef::new(SpaceTable::IconCode).string().null())
                    .col(ColumnDef::new(SpaceTable::IconType).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MenuRootTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MenuRootTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MenuRootTable::SpaceCode).string().not_null())
                    .col(ColumnDef::new(MenuRootTable::Label).string().null())
                    .col(
                        ColumnDef::new(MenuRootTable::Order)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(ColumnDef::new(MenuRootTable::IconCode).string().null())
                    .col(ColumnDef::new(MenuRootTable::IconType).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MenuResourceTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MenuResourceTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MenuResourceTable::RootId).integer().not_null())
                    .col(ColumnDef::new(MenuResourceTable::ResourceId).integer().null())
                    .col(ColumnDef::new(MenuResourceTable::Label).string().not_null())
                    .col(
                        ColumnDef::new(MenuResourceTable::Order)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(MenuResourceTable::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(MenuResourceTable::IconCode).string().null())
                    .col(ColumnDef::new(MenuResourceTable::IconType).string().null())
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MenuResourceTable::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MenuRootTable::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SpaceTable::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum CustomerTable {
    #[sea_orm(iden = "customer")]
    Table,
    Id,
    Name,
    City,
    Vip,
}

#[derive(DeriveIden)]
enum InvoiceTable {
    #[sea_orm(iden = "invoice")]
    Table,
    Id,
    CustomerId,
    Amount,
}

#[derive(DeriveIden)]
enum SpaceTable {
    #[sea_orm(iden = "furetui_space")]
    Table,
    Code,
    Label,
    Order,
    Description,
    IconCode,
    IconType,
}

#[derive(DeriveIden)]
enum MenuRootTable {
    #[sea_orm(iden = "furetui_menu_root")]
    Table,
    Id,
    SpaceCode,
    Label,
    Order,
    IconCode,
    IconType,
}

#[derive(DeriveIden)]
enum MenuResourceTable {
    #[sea_orm(iden = "furetui_menu_resource")]
    Table,
    Id,
    RootId,
    ResourceId,
    Label,
    Order,
    IsDefault,
    IconCode,
    IconType,
}
