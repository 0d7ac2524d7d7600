use relay_core::llm::Message;

use super::App;

impl App {
    // Partial answers are kept: relayed text is never retracted.
    pub fn record_exchange(&mut self, user: &str, reply: &str) {
        self.turns.push(Message::user(user));
        if !reply.is_empty() {
            self.turns.push(Message::assistant(reply));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::copilot::GatewayConfig;
    use relay_core::llm::Role;

    #[test]
    fn empty_reply_is_not_recorded() {
        let mut a = App::new(GatewayConfig::default());
        a.record_exchange("hi", "");
        a.record_exchange("again", "partial ans");
        let roles: Vec<Role> = a.turns.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
        assert_eq!(a.turns[2].content, "partial ans");
    }
}
