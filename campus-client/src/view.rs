//! Headless state for the feed and profile screens.
//!
//! A view owns the in-memory post list for one screen and applies mutation
//! responses in place: prepend on create, replace by id on update, splice on
//! delete. The list is only replaced wholesale when a screen mounts.
//!
//! Per-card transient state is an explicit machine instead of a pile of
//! booleans: a card is `Viewing`, `Editing` (with the draft text) or
//! `Submitting`, and while a request is in flight every other action on that
//! card is rejected. Card state does not survive a remount.

use std::collections::HashMap;

use uuid::Uuid;

use crate::Post;

#[derive(Debug, Clone, PartialEq)]
pub enum CardState {
    Viewing,
    Editing { draft: String },
    Submitting,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub state: CardState,
    pub comments_open: bool,
}

impl Default for Card {
    fn default() -> Self {
        Self {
            state: CardState::Viewing,
            comments_open: false,
        }
    }
}

#[derive(Default)]
pub struct FeedView {
    posts: Vec<Post>,
    cards: HashMap<Uuid, Card>,
}

impl FeedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount: replaces the whole list and discards all card state.
    pub fn set_posts(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.cards.clear();
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Profile screens show the same list narrowed to one user.
    pub fn posts_by(&self, user_id: Uuid) -> Vec<&Post> {
        self.posts.iter().filter(|p| p.user.id == user_id).collect()
    }

    pub fn card(&self, id: Uuid) -> Card {
        self.cards.get(&id).cloned().unwrap_or_default()
    }

    pub fn prepend(&mut self, post: Post) {
        self.posts.insert(0, post);
    }

    /// Replaces the matching post in place. Returns false when the post is
    /// not on this screen.
    pub fn replace(&mut self, post: Post) -> bool {
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => {
                *slot = post;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.posts.len();
        self.posts.retain(|p| p.id != id);
        self.cards.remove(&id);
        self.posts.len() < before
    }

    /// Viewing -> Editing, seeding the draft with the current content.
    pub fn begin_edit(&mut self, id: Uuid) -> bool {
        let Some(content) = self
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.content.clone())
        else {
            return false;
        };
        let card = self.cards.entry(id).or_default();
        if card.state != CardState::Viewing {
            return false;
        }
        card.state = CardState::Editing { draft: content };
        true
    }

    pub fn set_draft(&mut self, id: Uuid, draft: &str) -> bool {
        match self.cards.get_mut(&id) {
            Some(card) => match &mut card.state {
                CardState::Editing { draft: current } => {
                    *current = draft.to_string();
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    pub fn draft(&self, id: Uuid) -> Option<String> {
        match self.cards.get(&id)?.state {
            CardState::Editing { ref draft } => Some(draft.clone()),
            _ => None,
        }
    }

    /// Editing -> Viewing, dropping the draft.
    pub fn cancel_edit(&mut self, id: Uuid) -> bool {
        match self.cards.get_mut(&id) {
            Some(card) if matches!(card.state, CardState::Editing { .. }) => {
                card.state = CardState::Viewing;
                true
            }
            _ => false,
        }
    }

    /// Viewing or Editing -> Submitting. Returns false while a request is
    /// already in flight, which is what serializes actions per card.
    pub fn begin_submit(&mut self, id: Uuid) -> bool {
        let card = self.cards.entry(id).or_default();
        if card.state == CardState::Submitting {
            return false;
        }
        card.state = CardState::Submitting;
        true
    }

    /// Submitting -> Viewing; a successful mutation response replaces the
    /// post in place on the way.
    pub fn finish_submit(&mut self, id: Uuid, updated: Option<Post>) {
        if let Some(card) = self.cards.get_mut(&id) {
            card.state = CardState::Viewing;
        }
        if let Some(post) = updated {
            self.replace(post);
        }
    }

    pub fn is_submitting(&self, id: Uuid) -> bool {
        self.cards
            .get(&id)
            .map(|c| c.state == CardState::Submitting)
            .unwrap_or(false)
    }

    pub fn toggle_comments(&mut self, id: Uuid) {
        let card = self.cards.entry(id).or_default();
        card.comments_open = !card.comments_open;
    }
}
