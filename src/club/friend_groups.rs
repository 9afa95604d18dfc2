use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::ClubError;
use crate::keys;
use crate::store::{KeyValueStore, Value};

/// Maintains friend groups: any two players who have played each other end
/// up in the same group. Groups only ever grow or merge, so the structure is
/// a forest of flat sets with a per-player group pointer.
pub struct FriendGroups {
    store: Arc<dyn KeyValueStore>,
}

impl FriendGroups {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Links `pid1` and `pid2` after a game between them.
    #[instrument(skip(self))]
    pub async fn link(&self, pid1: &str, pid2: &str) -> Result<(), ClubError> {
        let fid1 = self.group_of(pid1).await?;
        let fid2 = self.group_of(pid2).await?;

        match (fid1, fid2) {
            // Neither in a group: mint a new one.
            (None, None) => {
                let fid = self.new_fid().await?;
                self.store.set_add(&keys::friend_group(&fid), pid1).await?;
                self.store.set_add(&keys::friend_group(&fid), pid2).await?;
                self.store
                    .mset(vec![
                        (keys::player_friend_group(pid1), Value::scalar(&fid)),
                        (keys::player_friend_group(pid2), Value::scalar(&fid)),
                    ])
                    .await?;
            }
            // One in a group: the other joins it.
            (Some(fid), None) => self.join(&fid, pid2).await?,
            (None, Some(fid)) => self.join(&fid, pid1).await?,
            (Some(fid1), Some(fid2)) if fid1 == fid2 => {}
            // Different groups: merge the smaller into the larger.
            (Some(fid1), Some(fid2)) => {
                let size1 = self.store.set_len(&keys::friend_group(&fid1)).await?;
                let size2 = self.store.set_len(&keys::friend_group(&fid2)).await?;
                let (big, small) = if size1 >= size2 {
                    (fid1, fid2)
                } else {
                    (fid2, fid1)
                };
                self.merge(&big, &small).await?;
            }
        }
        Ok(())
    }

    pub async fn group_of(&self, pid: &str) -> Result<Option<String>, ClubError> {
        match self.store.get(&keys::player_friend_group(pid)).await? {
            Some(value) => Ok(Some(
                value.as_scalar(&keys::player_friend_group(pid))?.to_string(),
            )),
            None => Ok(None),
        }
    }

    pub async fn members(&self, fid: &str) -> Result<Vec<String>, ClubError> {
        Ok(self
            .store
            .set_members(&keys::friend_group(fid))
            .await?
            .into_iter()
            .collect())
    }

    async fn join(&self, fid: &str, newcomer: &str) -> Result<(), ClubError> {
        self.store.set_add(&keys::friend_group(fid), newcomer).await?;
        self.store
            .set(&keys::player_friend_group(newcomer), Value::scalar(fid))
            .await?;
        Ok(())
    }

    async fn merge(&self, big: &str, small: &str) -> Result<(), ClubError> {
        let members = self.store.set_members(&keys::friend_group(small)).await?;
        for member in &members {
            self.store.set_add(&keys::friend_group(big), member).await?;
            self.store
                .set(&keys::player_friend_group(member), Value::scalar(big))
                .await?;
        }
        self.store.delete(&keys::friend_group(small)).await?;
        Ok(())
    }

    /// A group id not already in use.
    async fn new_fid(&self) -> Result<String, ClubError> {
        loop {
            let fid = Uuid::new_v4().simple().to_string();
            if !self.store.exists(&keys::friend_group(&fid)).await? {
                return Ok(fid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;

    fn groups() -> FriendGroups {
        FriendGroups::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn first_game_creates_a_shared_group() {
        let groups = groups();
        groups.link("a", "b").await.unwrap();

        let fid = groups.group_of("a").await.unwrap().unwrap();
        assert_eq!(groups.group_of("b").await.unwrap().unwrap(), fid);
        assert_eq!(groups.members(&fid).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn newcomer_joins_the_existing_group() {
        let groups = groups();
        groups.link("a", "b").await.unwrap();
        groups.link("b", "c").await.unwrap();

        let fid = groups.group_of("a").await.unwrap().unwrap();
        assert_eq!(groups.group_of("c").await.unwrap().unwrap(), fid);
        assert_eq!(groups.members(&fid).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn same_group_link_is_a_no_op() {
        let groups = groups();
        groups.link("a", "b").await.unwrap();
        let fid = groups.group_of("a").await.unwrap().unwrap();

        groups.link("a", "b").await.unwrap();
        assert_eq!(groups.group_of("a").await.unwrap().unwrap(), fid);
        assert_eq!(groups.members(&fid).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn smaller_group_merges_into_larger() {
        let groups = groups();
        groups.link("a", "b").await.unwrap();
        groups.link("b", "c").await.unwrap();
        groups.link("x", "y").await.unwrap();

        let big = groups.group_of("a").await.unwrap().unwrap();
        groups.link("c", "x").await.unwrap();

        for pid in ["a", "b", "c", "x", "y"] {
            assert_eq!(groups.group_of(pid).await.unwrap().unwrap(), big);
        }
        assert_eq!(groups.members(&big).await.unwrap().len(), 5);
    }
}
