use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use tracing::info;

use crate::{EngineError, ResultEngine, users, util::normalize_required_name};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a user that can own accounts and categories.
    pub async fn new_user(&self, username: &str) -> ResultEngine<()> {
        let username = normalize_required_name(username, "user")?;
        with_tx!(self, |db_tx| {
            let exists = users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(username));
            }
            users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            info!(%username, "user created");
            Ok(())
        })
    }
}
