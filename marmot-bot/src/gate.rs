//! Role-based authorization gate.
//!
//! Role holders come in two shapes: a full guild member from the API
//! and a plain list of role ids (partial payloads, tests, config). Both
//! implement [`HasRoles`] so the gate never branches on shape.

/// Anything that can answer "do you hold one of these roles?".
pub trait HasRoles {
    fn holds_any(&self, allowed: &[u64]) -> bool;
}

impl HasRoles for [u64] {
    fn holds_any(&self, allowed: &[u64]) -> bool {
        self.iter().any(|role| allowed.contains(role))
    }
}

impl HasRoles for Vec<u64> {
    fn holds_any(&self, allowed: &[u64]) -> bool {
        self.as_slice().holds_any(allowed)
    }
}

impl HasRoles for serenity::model::guild::Member {
    fn holds_any(&self, allowed: &[u64]) -> bool {
        self.roles.iter().any(|role| allowed.contains(&role.get()))
    }
}

impl HasRoles for serenity::model::guild::PartialMember {
    fn holds_any(&self, allowed: &[u64]) -> bool {
        self.roles.iter().any(|role| allowed.contains(&role.get()))
    }
}

/// Whether an invoker passes a command's role restriction.
///
/// An unrestricted command (empty allowlist) always passes, including
/// outside guilds where no member exists. A restricted command requires
/// a member holding at least one allowed role.
pub fn can_run(allowed: &[u64], member: Option<&dyn HasRoles>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match member {
        Some(member) => member.holds_any(allowed),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_always_passes() {
        assert!(can_run(&[], None));
        assert!(can_run(&[], Some(&vec![1, 2])));
    }

    #[test]
    fn test_restricted_requires_matching_role() {
        let allowed = [10, 20];
        assert!(can_run(&allowed, Some(&vec![20])));
        assert!(can_run(&allowed, Some(&vec![99, 10])));
        assert!(!can_run(&allowed, Some(&vec![99])));
        assert!(!can_run(&allowed, Some(&Vec::new())));
    }

    #[test]
    fn test_restricted_without_member_is_denied() {
        assert!(!can_run(&[10], None));
    }
}
