//! User, permission and role bookkeeping
//!
//! Users, permissions and roles are rows in caller-named application tables
//! with the minimal shapes `(username, password, role)`,
//! `(username, permission)` and `(role, description)`. Nothing here touches
//! the backend's own accounts or grants.

use tracing::info;

use super::DatabaseClient;
use crate::database::Value;
use crate::error::Result;
use crate::password::PasswordScheme;

const STANDARD_ROLES: &[(&str, &str)] = &[
    ("admin", "Administrator with full access"),
    ("user", "Regular user with limited access"),
    ("remote", "Remote user with specific permissions"),
    ("localhost", "Local user with specific permissions"),
];

impl DatabaseClient {
    /// Insert a user with the configured password scheme
    pub async fn create_user(
        &mut self,
        table_name: &str,
        username: &str,
        password: &str,
        role: &str,
    ) -> Result<()> {
        let scheme = self.config.password_scheme;
        self.create_user_with_scheme(table_name, username, password, role, scheme)
            .await
    }

    pub async fn create_user_with_scheme(
        &mut self,
        table_name: &str,
        username: &str,
        password: &str,
        role: &str,
        scheme: PasswordScheme,
    ) -> Result<()> {
        let hash = scheme.hash(password)?;
        self.insert(
            table_name,
            &["username", "password", "role"],
            &[Value::from(username), Value::from(hash), Value::from(role)],
        )
        .await?;
        info!(table = %table_name, username = %username, role = %role, "User created");
        Ok(())
    }

    /// Returns whether a user row was removed
    pub async fn delete_user(&mut self, table_name: &str, username: &str) -> Result<bool> {
        let removed = self
            .delete(table_name, "username = ?", &[Value::from(username)])
            .await?;
        Ok(removed > 0)
    }

    /// Returns whether a user row was updated
    pub async fn set_password(
        &mut self,
        table_name: &str,
        username: &str,
        new_password: &str,
    ) -> Result<bool> {
        let scheme = self.config.password_scheme;
        self.set_password_with_scheme(table_name, username, new_password, scheme)
            .await
    }

    pub async fn set_password_with_scheme(
        &mut self,
        table_name: &str,
        username: &str,
        new_password: &str,
        scheme: PasswordScheme,
    ) -> Result<bool> {
        let hash = scheme.hash(new_password)?;
        let updated = self
            .update(
                table_name,
                "password = ?",
                "username = ?",
                &[Value::from(hash), Value::from(username)],
            )
            .await?;
        Ok(updated > 0)
    }

    /// True only when `password` matches the stored hash; an unknown user is
    /// a plain `false`.
    ///
    /// The scheme is read off the stored value, so legacy hex digests and
    /// Argon2 strings can share a table.
    pub async fn verify_password(
        &mut self,
        table_name: &str,
        username: &str,
        password: &str,
    ) -> Result<bool> {
        let rows = self
            .fetch(table_name, &["password"], Some("username = ?"), &[Value::from(username)])
            .await?;

        let stored = match rows.first().and_then(|row| row.first()) {
            Some(Value::String(stored)) => stored,
            _ => return Ok(false),
        };
        Ok(PasswordScheme::detect(stored).verify(password, stored))
    }

    /// Grant a permission; granting one the user already holds is a no-op
    pub async fn grant_permission(
        &mut self,
        table_name: &str,
        username: &str,
        permission: &str,
    ) -> Result<()> {
        let existing = self
            .count_rows(
                table_name,
                Some("username = ? AND permission = ?"),
                &[Value::from(username), Value::from(permission)],
            )
            .await?;
        if existing == 0 {
            self.insert(
                table_name,
                &["username", "permission"],
                &[Value::from(username), Value::from(permission)],
            )
            .await?;
        }
        Ok(())
    }

    /// Returns whether the permission was held
    pub async fn revoke_permission(
        &mut self,
        table_name: &str,
        username: &str,
        permission: &str,
    ) -> Result<bool> {
        let removed = self
            .delete(
                table_name,
                "username = ? AND permission = ?",
                &[Value::from(username), Value::from(permission)],
            )
            .await?;
        Ok(removed > 0)
    }

    /// Distinct permissions of `username`, in first-granted order
    pub async fn get_permissions(&mut self, table_name: &str, username: &str) -> Result<Vec<String>> {
        let rows = self
            .fetch(table_name, &["permission"], Some("username = ?"), &[Value::from(username)])
            .await?;

        let mut permissions: Vec<String> = Vec::with_capacity(rows.len());
        for permission in rows.iter().filter_map(|row| row.first().and_then(Value::as_str)) {
            if !permissions.iter().any(|p| p == permission) {
                permissions.push(permission.to_string());
            }
        }
        Ok(permissions)
    }

    /// Seed a `(role, description)` table with admin, user, remote and localhost
    pub async fn create_roles(&mut self, table_name: &str) -> Result<u64> {
        let rows: Vec<_> = STANDARD_ROLES
            .iter()
            .map(|(role, description)| vec![Value::from(*role), Value::from(*description)])
            .collect();
        self.batch_insert(table_name, &["role", "description"], &rows)
            .await
    }
}
