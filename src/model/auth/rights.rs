use crate::model::db::voter::Role;

/// A class of routes, defining which roles may access it.
pub trait Rights {
    /// Name used in log messages.
    const NAME: &'static str;

    /// Does a user with this role hold these rights?
    fn permits(role: Role) -> bool;
}

/// Any signed-in user, voter or admin.
pub struct User;

impl Rights for User {
    const NAME: &'static str = "user";

    fn permits(_role: Role) -> bool {
        true
    }
}

/// Administrators only.
pub struct Admin;

impl Rights for Admin {
    const NAME: &'static str = "admin";

    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}
