/// Mutable authentication state for one logical user.
///
/// The session is owned by the client and changes in exactly three places:
/// the ticket handshake populates it, a rejected ticket-granting ticket
/// clears the stored ticket, and an unauthorized response invalidates the
/// authenticated flag before re-authentication.
#[derive(Debug, Default)]
pub struct Session {
    ticket_granting_ticket: Option<String>,
    user_id: Option<String>,
    authenticated: bool,
}

impl Session {
    pub(crate) fn new(ticket_granting_ticket: Option<String>) -> Self {
        Self {
            ticket_granting_ticket,
            user_id: None,
            authenticated: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Resolved user identifier, set once the session is established.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn ticket_granting_ticket(&self) -> Option<&str> {
        self.ticket_granting_ticket.as_deref()
    }

    pub(crate) fn store_ticket(&mut self, ticket: String) {
        self.ticket_granting_ticket = Some(ticket);
    }

    /// Drops a ticket-granting ticket the upstream no longer recognizes.
    pub(crate) fn clear_ticket(&mut self) {
        self.ticket_granting_ticket = None;
    }

    /// Marks the session established for the given user.
    pub(crate) fn establish(&mut self, user_id: String) {
        self.user_id = Some(user_id);
        self.authenticated = true;
    }

    /// Flags the session as expired. The ticket-granting ticket is kept so
    /// re-authentication can skip ticket issuance when it is still valid.
    pub(crate) fn invalidate(&mut self) {
        self.authenticated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new(Some("TGT-1".to_string()));
        assert!(!session.is_authenticated());
        assert!(session.user_id().is_none());
        assert_eq!(session.ticket_granting_ticket(), Some("TGT-1"));
    }

    #[test]
    fn test_establish_sets_user_and_flag() {
        let mut session = Session::default();
        session.establish("4711".to_string());
        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some("4711"));
    }

    #[test]
    fn test_invalidate_keeps_ticket() {
        let mut session = Session::new(Some("TGT-1".to_string()));
        session.establish("4711".to_string());
        session.invalidate();
        assert!(!session.is_authenticated());
        assert_eq!(session.ticket_granting_ticket(), Some("TGT-1"));
    }

    #[test]
    fn test_clear_ticket_drops_only_the_ticket() {
        let mut session = Session::new(Some("TGT-1".to_string()));
        session.establish("4711".to_string());
        session.clear_ticket();
        assert!(session.ticket_granting_ticket().is_none());
        assert!(session.is_authenticated());
    }
}
