// src/services.rs

pub mod auth;
pub mod resource_list;
pub mod sale_composer;
pub mod sales;
pub mod users;

pub use auth::AuthService;
pub use resource_list::{RefreshMode, Resource, ResourceListController};
pub use sale_composer::{
    LineEdit, LocalOnlyStatusHandler, RemoteStatusHandler, SaleComposer, SaleStatusHandler,
};
pub use sales::SalesController;
pub use users::OrganizationUsers;
