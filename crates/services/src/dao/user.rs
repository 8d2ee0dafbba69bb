use bson::{doc, DateTime, Document};
use mongodb::Database;
use voxroom_db::models::User;

use super::base::{BaseDao, DaoError, DaoResult};

/// How an account is identified at sign-in.
#[derive(Debug, Clone, Copy)]
pub enum Login<'a> {
    Email(&'a str),
    Username(&'a str),
}

impl Login<'_> {
    fn filter(self) -> Document {
        match self {
            Login::Email(email) => doc! { "email": email },
            Login::Username(username) => doc! { "username": username },
        }
    }
}

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    /// Inserts a local account. A taken email or username surfaces as
    /// [`DaoError::DuplicateKey`] from the unique indexes.
    pub async fn register(
        &self,
        email: String,
        username: String,
        display_name: String,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let mut account = User {
            id: None,
            email,
            username,
            display_name,
            avatar: None,
            password_hash: Some(password_hash),
            created_at: now,
            updated_at: now,
        };
        account.id = Some(self.base.insert_one(&account).await?);
        Ok(account)
    }

    pub async fn find_for_login(&self, login: Login<'_>) -> DaoResult<User> {
        self.base
            .find_one(login.filter())
            .await?
            .ok_or(DaoError::Missing("Account"))
    }
}
