use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::entities::{prelude::*, user};
use crate::models::user::{ProfileUpdate, User};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model_to_user(model: user::Model) -> User {
        User {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            created_at: model.created_at,
        }
    }

    pub async fn create(
        &self,
        username: &str,
        email: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User> {
        let active_model = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.map(str::to_string)),
            first_name: Set(first_name.map(str::to_string)),
            last_name: Set(last_name.map(str::to_string)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active_model
            .insert(&self.conn)
            .await
            .with_context(|| format!("Failed to create user '{username}'"))?;

        info!("Created user {} ({})", model.id, model.username);
        Ok(Self::map_model_to_user(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<User>> {
        let model = Users::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(Self::map_model_to_user))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let model = Users::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model_to_user))
    }

    /// Applies a profile update: a present-and-null field is cleared, a
    /// present-and-value field is set, an absent field is left alone.
    /// Returns the updated user, or None when the user does not exist.
    pub async fn update_profile(
        &self,
        id: i32,
        update: &ProfileUpdate,
    ) -> Result<Option<User>> {
        let Some(model) = Users::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        if update.is_empty() {
            return Ok(Some(Self::map_model_to_user(model)));
        }

        let mut active: user::ActiveModel = model.into();
        if let Some(value) = &update.first_name {
            active.first_name = Set(value.clone());
        }
        if let Some(value) = &update.last_name {
            active.last_name = Set(value.clone());
        }
        if let Some(value) = &update.email {
            active.email = Set(value.clone());
        }

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model_to_user(model)))
    }
}
