use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

/// 利用者リポジトリ
#[async_trait]
pub trait UserRepository {
    /// IDで利用者を検索する
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DataAccessError>;
    /// 利用者を保存する
    async fn save(&mut self, entity: &mut User) -> Result<bool, DataAccessError>;
    /// 利用者を削除する
    async fn delete(&mut self, entity: &mut User) -> Result<bool, DataAccessError>;
}

/// 利用者ID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct UserId(u64);

impl Id for UserId {
    type Inner = u64;
}

/// 利用者イベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    /// 利用者が登録された
    UserRegistered {
        id: UserId,
        name: String,
        email: String,
        phone: String,
        role: Role,
        password: PasswordDigest,
    },
    /// プロフィールが変更された
    ProfileChanged {
        id: UserId,
        name: String,
        phone: String,
    },
    /// メールアドレスが変更された
    EmailChanged { id: UserId, email: String },
    /// 権限が変更された
    RoleChanged { id: UserId, role: Role },
    /// パスワードが変更された
    PasswordChanged { id: UserId, password: PasswordDigest },
    /// 利用者が削除された
    UserDeleted { id: UserId },
}

impl Event for UserEvent {
    type Id = UserId;

    fn is_creation(&self) -> bool {
        matches!(self, UserEvent::UserRegistered { .. })
    }
}

/// 利用者エンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    role: Role,
    password: PasswordDigest,
    #[serde(skip)]
    events: EventQueue<UserEvent>,
}

impl User {
    pub fn register(
        id: UserId,
        name: String,
        email: String,
        phone: String,
        role: Role,
        password: PasswordDigest,
    ) -> Result<Self, UserError> {
        Self::validate_registered(&name, &email)?;
        let mut entity = User {
            id,
            name: name.clone(),
            email: email.clone(),
            phone: phone.clone(),
            role,
            password: password.clone(),
            ..Default::default()
        };
        entity.events.push(UserEvent::UserRegistered {
            id,
            name,
            email,
            phone,
            role,
            password,
        });
        Ok(entity)
    }

    pub fn change_profile(&mut self, name: String, phone: String) -> Result<(), UserError> {
        Self::validate_name(&name)?;
        self.name = name.clone();
        self.phone = phone.clone();
        self.events
            .push(UserEvent::ProfileChanged { id: self.id, name, phone });
        Ok(())
    }

    pub fn change_email(&mut self, email: String) -> Result<(), UserError> {
        Self::validate_email(&email)?;
        self.email = email.clone();
        self.events.push(UserEvent::EmailChanged { id: self.id, email });
        Ok(())
    }

    pub fn change_role(&mut self, role: Role) {
        self.role = role;
        self.events.push(UserEvent::RoleChanged { id: self.id, role });
    }

    pub fn change_password(&mut self, password: PasswordDigest) {
        self.password = password.clone();
        self.events
            .push(UserEvent::PasswordChanged { id: self.id, password });
    }

    pub fn delete(&mut self) {
        self.events.push(UserEvent::UserDeleted { id: self.id });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn password(&self) -> &PasswordDigest {
        &self.password
    }

    fn validate_id(&self, id: &UserId) -> Result<(), UserError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(UserError::MismatchedId),
        }
    }

    fn validate_registered(name: &str, email: &str) -> Result<(), UserError> {
        Self::validate_name(name)?;
        Self::validate_email(email)
    }

    fn validate_name(name: &str) -> Result<(), UserError> {
        match name.trim().is_empty() {
            true => Err(UserError::NameIsBlank),
            false => Ok(()),
        }
    }

    fn validate_email(email: &str) -> Result<(), UserError> {
        match email.contains('@') {
            true => Ok(()),
            false => Err(UserError::InvalidEmail),
        }
    }
}

impl Entity for User {
    type Id = UserId;

    const ENTITY_NAME: &'static str = "user";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for User {
    type Event = UserEvent;
    type Error = UserError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            UserEvent::UserRegistered { name, email, .. } => {
                Self::validate_registered(name, email)
            }
            UserEvent::ProfileChanged { id, name, .. } => {
                self.validate_id(id)?;
                Self::validate_name(name)
            }
            UserEvent::EmailChanged { id, email } => {
                self.validate_id(id)?;
                Self::validate_email(email)
            }
            UserEvent::RoleChanged { id, .. }
            | UserEvent::PasswordChanged { id, .. }
            | UserEvent::UserDeleted { id } => self.validate_id(id),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            UserEvent::UserRegistered {
                id,
                name,
                email,
                phone,
                role,
                password,
            } => {
                if self.id != id {
                    if let Ok(entity) = Self::register(id, name, email, phone, role, password) {
                        *self = entity;
                    }
                }
            }
            UserEvent::ProfileChanged { id, name, phone } => {
                if self.id == id {
                    if let Err(_e) = self.change_profile(name, phone) {}
                }
            }
            UserEvent::EmailChanged { id, email } => {
                if self.id == id {
                    if let Err(_e) = self.change_email(email) {}
                }
            }
            UserEvent::RoleChanged { id, role } => {
                if self.id == id {
                    self.change_role(role);
                }
            }
            UserEvent::PasswordChanged { id, password } => {
                if self.id == id {
                    self.change_password(password);
                }
            }
            UserEvent::UserDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.email == other.email
            && self.phone == other.phone
            && self.role == other.role
            && self.password == other.password
    }
}

impl Eq for User {}

/// 利用者エラー
#[derive(Error, Display, Debug)]
pub enum UserError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// 名前が空欄です
    #[display(fmt = "Name cannot be blank")]
    NameIsBlank,
    /// メールアドレスが不正です
    #[display(fmt = "Invalid email address")]
    InvalidEmail,
    /// パスワードが短すぎます
    #[display(fmt = "Password must be at least 8 characters")]
    PasswordTooShort,
}

/// 権限
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// 宿泊客
    Customer,
    /// 管理者
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

/// ソルト付きパスワードダイジェスト
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PasswordDigest {
    salt: String,
    digest: String,
}

impl PasswordDigest {
    /// 平文パスワードからダイジェストを生成する
    pub fn new(password: &str, salt: &str) -> Result<Self, UserError> {
        if password.len() < 8 {
            return Err(UserError::PasswordTooShort);
        }
        Ok(Self {
            salt: salt.to_owned(),
            digest: Self::digest_of(password, salt),
        })
    }

    pub fn verify(&self, password: &str) -> bool {
        Self::digest_of(password, &self.salt) == self.digest
    }

    fn digest_of(password: &str, salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        STANDARD.encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::register(
            UserId(5),
            "山田太郎".to_owned(),
            "taro@example.com".to_owned(),
            "090-0000-0000".to_owned(),
            Role::Customer,
            PasswordDigest::new("kakurega1", "salt").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_user_register() {
        let user = user();
        assert_eq!(user.id(), UserId(5));
        assert_eq!(user.role(), Role::Customer);
    }

    #[test]
    fn test_invalid_email_rejected() {
        let result = User::register(
            UserId(6),
            "名前".to_owned(),
            "not-an-email".to_owned(),
            String::new(),
            Role::Customer,
            PasswordDigest::default(),
        );
        assert!(matches!(result, Err(UserError::InvalidEmail)));
    }

    #[test]
    fn test_role_change() {
        let mut user = user();
        user.change_role(Role::Admin);
        assert_eq!(user.role(), Role::Admin);
    }

    #[test]
    fn test_password_digest_verify() {
        let digest = PasswordDigest::new("kakurega1", "salt").unwrap();
        assert!(digest.verify("kakurega1"));
        assert!(!digest.verify("chigau-pass"));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            PasswordDigest::new("short", "salt"),
            Err(UserError::PasswordTooShort)
        ));
    }
}
