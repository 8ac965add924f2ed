use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
    sea_query::Expr,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    Account, EngineError, NewAccountCmd, ResultEngine, accounts, policy,
    util::{normalize_name_key, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Fails with `ExistingKey` if another active account of `owner` already
    /// uses `name` (case-insensitive).
    async fn ensure_account_name_free(
        &self,
        db: &DatabaseTransaction,
        owner: &str,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::Owner.eq(owner.to_string()))
            .filter(accounts::Column::Active.eq(true))
            .filter(accounts::Column::NameNorm.eq(normalize_name_key(name)));
        if let Some(id) = except {
            query = query.filter(accounts::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }

    /// Opens an account whose balance starts at its initial balance.
    ///
    /// The initial balance must already respect the sign rule of the kind:
    /// a card cannot open in credit, any other account cannot open overdrawn.
    pub async fn new_account(&self, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let NewAccountCmd {
            owner,
            name,
            kind,
            currency,
            initial_balance,
        } = cmd;
        let name = normalize_required_name(&name, "account")?;
        policy::admissible(kind, initial_balance)?;

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, &owner).await?;
            self.ensure_account_name_free(&db_tx, &owner, &name, None)
                .await?;

            let account = Account::new(owner, name, kind, currency, initial_balance, Utc::now());
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            info!(
                account_id = %account.id,
                owner = %account.owner,
                kind = account.kind.as_str(),
                initial_balance = %account.initial_balance,
                "account created"
            );
            Ok(account)
        })
    }

    /// Returns an account owned by `owner`, inactive ones included.
    pub async fn account(&self, account_id: Uuid, owner: &str) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, owner).await?;
            Account::try_from(model)
        })
    }

    /// Lists the accounts of `owner` ordered by name.
    pub async fn list_accounts(
        &self,
        owner: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            let mut query =
                accounts::Entity::find().filter(accounts::Column::Owner.eq(owner.to_string()));
            if !include_inactive {
                query = query.filter(accounts::Column::Active.eq(true));
            }
            let models = query
                .order_by_asc(accounts::Column::Name)
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Account::try_from).collect()
        })
    }

    pub async fn rename_account(
        &self,
        account_id: Uuid,
        owner: &str,
        name: &str,
    ) -> ResultEngine<Account> {
        let name = normalize_required_name(name, "account")?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_active_account(&db_tx, account_id, owner)
                .await?;
            self.ensure_account_name_free(&db_tx, owner, &name, Some(account_id))
                .await?;

            let mut account = Account::try_from(model)?;
            account.name = name.clone();
            accounts::Entity::update_many()
                .col_expr(accounts::Column::Name, Expr::value(name.clone()))
                .col_expr(
                    accounts::Column::NameNorm,
                    Expr::value(normalize_name_key(&name)),
                )
                .filter(accounts::Column::Id.eq(account_id.to_string()))
                .exec(&db_tx)
                .await?;
            Ok(account)
        })
    }

    /// Soft deletes an account.
    ///
    /// Its transactions stay untouched; it just stops accepting new ones.
    /// Deleting an already inactive account is a no-op.
    pub async fn delete_account(&self, account_id: Uuid, owner: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, owner).await?;
            if !model.active {
                return Ok(());
            }
            let result = accounts::Entity::update_many()
                .col_expr(accounts::Column::Active, Expr::value(false))
                .col_expr(accounts::Column::DeletedAt, Expr::value(Some(Utc::now())))
                .col_expr(accounts::Column::Version, Expr::value(model.version + 1))
                .filter(accounts::Column::Id.eq(account_id.to_string()))
                .filter(accounts::Column::Version.eq(model.version))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::Conflict(format!(
                    "account {account_id} was modified concurrently"
                )));
            }
            info!(%account_id, "account deleted");
            Ok(())
        })
    }
}
