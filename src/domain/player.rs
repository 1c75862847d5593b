// Room membership and per-player game attributes.

pub type PlayerId = u64;

/// Identity supplied by the client at join time.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub display_name: String,
    pub avatar_id: String,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub avatar_id: String,
    pub is_host: bool,
    pub is_eliminated: bool,
    /// Round in which the player was eliminated; used for tie-breaking.
    pub eliminated_round: Option<u32>,
    pub score: u32,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    RoomFull,
    DuplicateJoin,
    InvalidName,
}

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 12;

/// Ordered membership for one room. Join order is preserved across
/// disconnects and restarts; only an explicit leave removes a player.
#[derive(Debug)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    max_players: usize,
    next_player_id: PlayerId,
}

impl PlayerRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            players: Vec::new(),
            max_players,
            next_player_id: 1,
        }
    }

    /// Adds a player, or resumes a disconnected one when `resume` names an
    /// existing id. A resume for a still-connected id is refused.
    pub fn join(
        &mut self,
        profile: PlayerProfile,
        resume: Option<PlayerId>,
    ) -> Result<PlayerId, JoinError> {
        let name_len = profile.display_name.chars().count();
        if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name_len) {
            return Err(JoinError::InvalidName);
        }

        if let Some(id) = resume {
            if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
                if player.connected {
                    return Err(JoinError::DuplicateJoin);
                }
                player.connected = true;
                return Ok(id);
            }
            // Unknown resume ids fall through to a fresh join; the caller
            // learns the newly assigned id from the ack.
        }

        if self.players.len() >= self.max_players {
            return Err(JoinError::RoomFull);
        }

        let id = self.next_player_id;
        self.next_player_id += 1;
        self.players.push(Player {
            id,
            display_name: profile.display_name,
            avatar_id: profile.avatar_id,
            is_host: self.players.is_empty(),
            is_eliminated: false,
            eliminated_round: None,
            score: 0,
            connected: true,
        });
        Ok(id)
    }

    /// Marks a player disconnected, transferring the host role if needed.
    /// Returns false for unknown ids.
    pub fn mark_disconnected(&mut self, id: PlayerId) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        player.connected = false;
        let was_host = player.is_host;
        if was_host {
            self.transfer_host(id);
        }
        true
    }

    /// Removes a player entirely (explicit leave). Returns false for
    /// unknown ids.
    pub fn remove(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return false;
        };
        let was_host = self.players[index].is_host;
        self.players.remove(index);
        if was_host {
            self.transfer_host(id);
        }
        true
    }

    // Host goes to the earliest-joined remaining connected player, falling
    // back to the earliest-joined player when everyone is disconnected.
    fn transfer_host(&mut self, from: PlayerId) {
        for player in &mut self.players {
            player.is_host = false;
        }
        let heir = self
            .players
            .iter()
            .position(|p| p.connected && p.id != from)
            .or_else(|| self.players.iter().position(|p| p.id != from))
            // A lone disconnected player keeps the role for their reconnect.
            .or_else(|| self.players.iter().position(|p| p.id == from));
        if let Some(index) = heir {
            self.players[index].is_host = true;
        }
    }

    pub fn eliminate(&mut self, id: PlayerId, round: u32) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.is_eliminated = true;
            player.eliminated_round = Some(round);
        }
    }

    pub fn add_score(&mut self, id: PlayerId, delta: u32) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.score += delta;
        }
    }

    /// Restart semantics: scores and eliminations reset, identity and join
    /// order preserved.
    pub fn reset_all(&mut self) {
        for player in &mut self.players {
            player.score = 0;
            player.is_eliminated = false;
            player.eliminated_round = None;
        }
    }

    /// Players the current round waits on: connected and not eliminated.
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.connected && !p.is_eliminated)
            .map(|p| p.id)
            .collect()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.is_host)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Final scoreboard order: score descending, then later (or no)
    /// elimination ranks higher, then join order.
    pub fn final_standings(&self) -> Vec<Player> {
        let mut indexed: Vec<(usize, Player)> =
            self.players.iter().cloned().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            b.score
                .cmp(&a.score)
                .then_with(|| match (a.eliminated_round, b.eliminated_round) {
                    (None, None) => std::cmp::Ordering::Equal,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (Some(ra), Some(rb)) => rb.cmp(&ra),
                })
                .then_with(|| ia.cmp(ib))
        });
        indexed.into_iter().map(|(_, p)| p).collect()
    }
}

/// Outcome of a finished game, computed once at game-over.
#[derive(Debug, Clone)]
pub struct GameResult {
    pub winner: Option<Player>,
    pub final_scores: Vec<Player>,
    pub rounds_played: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> PlayerProfile {
        PlayerProfile {
            display_name: name.to_string(),
            avatar_id: "1".to_string(),
        }
    }

    #[test]
    fn first_player_is_host() {
        let mut registry = PlayerRegistry::new(8);
        let alice = registry.join(profile("alice"), None).unwrap();
        let bob = registry.join(profile("bob"), None).unwrap();
        assert!(registry.is_host(alice));
        assert!(!registry.is_host(bob));
    }

    #[test]
    fn name_length_is_validated() {
        let mut registry = PlayerRegistry::new(8);
        assert_eq!(registry.join(profile("ab"), None), Err(JoinError::InvalidName));
        assert_eq!(
            registry.join(profile("thisnameistoolong"), None),
            Err(JoinError::InvalidName)
        );
        assert!(registry.join(profile("abc"), None).is_ok());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut registry = PlayerRegistry::new(2);
        registry.join(profile("alice"), None).unwrap();
        registry.join(profile("bobby"), None).unwrap();
        assert_eq!(
            registry.join(profile("carol"), None),
            Err(JoinError::RoomFull)
        );
    }

    #[test]
    fn resume_requires_disconnect() {
        let mut registry = PlayerRegistry::new(8);
        let alice = registry.join(profile("alice"), None).unwrap();
        assert_eq!(
            registry.join(profile("alice"), Some(alice)),
            Err(JoinError::DuplicateJoin)
        );
        registry.mark_disconnected(alice);
        assert_eq!(registry.join(profile("alice"), Some(alice)), Ok(alice));
        assert!(registry.get(alice).unwrap().connected);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn host_transfers_to_earliest_connected() {
        let mut registry = PlayerRegistry::new(8);
        let alice = registry.join(profile("alice"), None).unwrap();
        let bob = registry.join(profile("bob-1"), None).unwrap();
        let carol = registry.join(profile("carol"), None).unwrap();
        registry.mark_disconnected(bob);
        registry.remove(alice);
        assert!(registry.is_host(carol));
    }

    #[test]
    fn reset_preserves_membership_order() {
        let mut registry = PlayerRegistry::new(8);
        let alice = registry.join(profile("alice"), None).unwrap();
        let bob = registry.join(profile("bob-1"), None).unwrap();
        registry.add_score(alice, 30);
        registry.eliminate(bob, 3);
        registry.reset_all();
        let players = registry.players();
        assert_eq!(players[0].id, alice);
        assert_eq!(players[1].id, bob);
        assert!(players.iter().all(|p| p.score == 0 && !p.is_eliminated));
        assert!(players.iter().all(|p| p.eliminated_round.is_none()));
    }

    #[test]
    fn standings_order_scores_then_elimination_then_join() {
        let mut registry = PlayerRegistry::new(8);
        let alice = registry.join(profile("alice"), None).unwrap();
        let bob = registry.join(profile("bob-1"), None).unwrap();
        let carol = registry.join(profile("carol"), None).unwrap();
        registry.add_score(alice, 20);
        registry.add_score(bob, 20);
        registry.add_score(carol, 40);
        registry.eliminate(alice, 2);
        registry.eliminate(bob, 3);
        let standings = registry.final_standings();
        let ids: Vec<PlayerId> = standings.iter().map(|p| p.id).collect();
        // carol highest score; bob outlasted alice at equal score
        assert_eq!(ids, vec![carol, bob, alice]);
    }
}
