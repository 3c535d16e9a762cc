use pbadv_core::{CloseReason, LinkId};

use super::types::{LinkRole, LinkState};
use crate::transport::FrameToken;

/// Pending teardown started by this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closing {
    pub reason: CloseReason,
    /// Close frame queued in the transport, if the transmit succeeded.
    pub frame: Option<FrameToken>,
}

#[derive(Debug, Clone, Default)]
pub struct Link {
    id: LinkId,
    role: Option<LinkRole>,
    state: LinkState,
    invalid: bool,
    closing: Option<Closing>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn role(&self) -> Option<LinkRole> {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == LinkState::Idle
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn closing(&self) -> Option<Closing> {
        self.closing
    }

    /// Whether a frame for `link_id` belongs to this link. Any id matches
    /// while idle so Link Open can bootstrap a session.
    pub fn accepts(&self, link_id: LinkId) -> bool {
        self.is_idle() || self.id == link_id
    }

    /// Provisioner side: start opening with a freshly drawn id.
    pub fn begin_open(&mut self, id: LinkId) {
        self.reset();
        self.id = id;
        self.role = Some(LinkRole::Provisioner);
        self.state = LinkState::Opening;
    }

    /// Device side: a matching Link Open goes straight to active.
    pub fn accept_open(&mut self, id: LinkId) {
        self.reset();
        self.id = id;
        self.role = Some(LinkRole::Device);
        self.state = LinkState::Active;
    }

    pub fn activate(&mut self) {
        self.state = LinkState::Active;
    }

    pub fn mark_invalid(&mut self) {
        self.invalid = true;
    }

    pub fn begin_closing(&mut self, reason: CloseReason) {
        self.state = LinkState::Closing;
        self.closing = Some(Closing {
            reason,
            frame: None,
        });
    }

    pub fn set_close_frame(&mut self, token: FrameToken) {
        if let Some(closing) = self.closing.as_mut() {
            closing.frame = Some(token);
        }
    }

    /// Reason to report if `token` is this link's close frame.
    pub fn close_frame_sent(&self, token: FrameToken) -> Option<CloseReason> {
        self.closing
            .filter(|closing| closing.frame == Some(token))
            .map(|closing| closing.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_accepts_any_link_id() {
        let link = Link::new();
        assert!(link.accepts(LinkId::new(1)));
        assert!(link.accepts(LinkId::new(2)));
        assert_eq!(link.role(), None);
    }

    #[test]
    fn provisioner_lifecycle() {
        let mut link = Link::new();
        link.begin_open(LinkId::new(0xABCD));
        assert_eq!(link.state(), LinkState::Opening);
        assert_eq!(link.role(), Some(LinkRole::Provisioner));
        assert!(link.accepts(LinkId::new(0xABCD)));
        assert!(!link.accepts(LinkId::new(0x1234)));

        link.activate();
        assert_eq!(link.state(), LinkState::Active);

        link.begin_closing(CloseReason::Success);
        link.set_close_frame(FrameToken::new(9));
        assert_eq!(link.state(), LinkState::Closing);
        assert_eq!(link.close_frame_sent(FrameToken::new(8)), None);
        assert_eq!(
            link.close_frame_sent(FrameToken::new(9)),
            Some(CloseReason::Success)
        );

        link.reset();
        assert!(link.is_idle());
        assert_eq!(link.closing(), None);
    }

    #[test]
    fn device_opens_straight_to_active() {
        let mut link = Link::new();
        link.accept_open(LinkId::new(5));
        assert_eq!(link.state(), LinkState::Active);
        assert_eq!(link.role(), Some(LinkRole::Device));
    }

    #[test]
    fn invalid_flag_clears_on_reset() {
        let mut link = Link::new();
        link.accept_open(LinkId::new(5));
        link.mark_invalid();
        assert!(link.is_invalid());
        link.reset();
        assert!(!link.is_invalid());
    }
}
