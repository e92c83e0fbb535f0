mod models;
mod postgres;
mod store;

pub use self::{
    models::WebhookConfig,
    postgres::{DBPool, init_db_from_env, migrate, new_db_pool},
    store::PostStore,
};
