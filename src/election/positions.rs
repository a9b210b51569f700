use chrono::Utc;
use log::info;

use crate::error::{Error, Result};
use crate::model::{
    api::position::{PositionPatch, PositionSpec},
    db::position::{NewPosition, Position, PositionStatus, SelectionRules},
    mongodb::Id,
};
use crate::store::{store_guard, Db};

const DEFAULT_MIN_WINNERS: i64 = 1;
const DEFAULT_MIN_SELECTABLE: i64 = 0;
const DEFAULT_MAX_SELECTABLE: i64 = 1;

/// Trim a text field, treating blank as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Positions and their selection rules.
pub struct PositionRegistry {
    db: Db,
}

store_guard!(PositionRegistry);

impl PositionRegistry {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, spec: PositionSpec) -> Result<Position> {
        let name = non_blank(spec.name).ok_or(Error::MissingField("name"))?;
        let rules = SelectionRules::new(
            spec.min_winners.unwrap_or(DEFAULT_MIN_WINNERS),
            spec.min_selectable.unwrap_or(DEFAULT_MIN_SELECTABLE),
            spec.max_selectable.unwrap_or(DEFAULT_MAX_SELECTABLE),
        )?;
        let position = NewPosition::new(
            name,
            non_blank(spec.description),
            spec.status.unwrap_or_default(),
            spec.order.unwrap_or_default(),
            rules,
        );

        let position = self.db.insert_position(&position).await?;
        info!("Created position {} ({})", position.name, position.id);
        Ok(position)
    }

    pub async fn get(&self, id: Id) -> Result<Position> {
        self.db
            .find_position(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Position {id}")))
    }

    pub async fn list(&self, status: Option<PositionStatus>) -> Result<Vec<Position>> {
        self.db.list_positions(status).await
    }

    /// Merge a partial update, re-validating the selection rules as a whole.
    pub async fn update(&self, id: Id, patch: PositionPatch) -> Result<Position> {
        let mut position = self.get(id).await?;

        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::MissingField("name"));
            }
            position.name = name.to_string();
        }
        if let Some(description) = patch.description {
            position.description = non_blank(Some(description));
        }
        if let Some(status) = patch.status {
            position.status = status;
        }
        if let Some(order) = patch.order {
            position.order = order;
        }
        let current = position.rules();
        let rules = SelectionRules::new(
            patch.min_winners.unwrap_or(current.min_winners.into()),
            patch
                .min_selectable
                .unwrap_or(current.min_selectable.into()),
            patch
                .max_selectable
                .unwrap_or(current.max_selectable.into()),
        )?;
        position.set_rules(rules);
        position.updated_at = Utc::now();

        if !self.db.replace_position(&position).await? {
            return Err(Error::not_found(format!("Position {id}")));
        }
        info!("Updated position {} ({})", position.name, position.id);
        Ok(position)
    }

    /// Delete a position, refusing while any candidate still stands for it.
    pub async fn delete(&self, id: Id) -> Result<()> {
        let position = self.get(id).await?;
        let dependents = self.db.count_candidates_for(id).await?;
        if dependents > 0 {
            return Err(Error::HasDependents(dependents));
        }
        if !self.db.delete_position(id).await? {
            return Err(Error::not_found(format!("Position {id}")));
        }
        info!("Deleted position {} ({id})", position.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::candidate::CandidateCore;

    use super::*;

    fn registry() -> PositionRegistry {
        PositionRegistry::new(Db::memory())
    }

    #[rocket::async_test]
    async fn create_applies_defaults() {
        let registry = registry();
        let position = registry
            .create(PositionSpec {
                name: Some("  Secretary ".to_string()),
                description: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(position.name, "Secretary");
        assert_eq!(position.description, None);
        assert_eq!(position.status, PositionStatus::Active);
        assert_eq!(position.order, 0);
        assert_eq!(position.min_winners, 1);
        assert_eq!(position.min_selectable, 0);
        assert_eq!(position.max_selectable, 1);
    }

    #[rocket::async_test]
    async fn create_validates_input() {
        let registry = registry();
        assert!(matches!(
            registry.create(PositionSpec::default()).await,
            Err(Error::MissingField("name"))
        ));

        let mut spec = PositionSpec::example();
        spec.min_selectable = Some(3);
        spec.max_selectable = Some(2);
        assert!(matches!(
            registry.create(spec).await,
            Err(Error::InvalidRange(_))
        ));

        registry.create(PositionSpec::example()).await.unwrap();
        assert!(matches!(
            registry.create(PositionSpec::example()).await,
            Err(Error::DuplicateName(_))
        ));
    }

    #[rocket::async_test]
    async fn update_merges_and_revalidates() {
        let registry = registry();
        let position = registry.create(PositionSpec::example2()).await.unwrap();

        let updated = registry
            .update(
                position.id,
                PositionPatch {
                    max_selectable: Some(3),
                    order: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.max_selectable, 3);
        assert_eq!(updated.min_selectable, 1);
        assert_eq!(updated.order, 7);
        assert_eq!(updated.name, "Board Member");

        // The merged range must still hold.
        let err = registry
            .update(
                position.id,
                PositionPatch {
                    min_selectable: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)));
        assert_eq!(registry.get(position.id).await.unwrap().min_selectable, 1);
    }

    #[rocket::async_test]
    async fn rename_to_existing_name_conflicts() {
        let registry = registry();
        registry.create(PositionSpec::example()).await.unwrap();
        let other = registry.create(PositionSpec::example2()).await.unwrap();

        let err = registry
            .update(
                other.id,
                PositionPatch {
                    name: Some("President".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(_)));
    }

    #[rocket::async_test]
    async fn unknown_positions_are_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.get(Id::new()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            registry.update(Id::new(), PositionPatch::default()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            registry.delete(Id::new()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn delete_is_blocked_by_candidates() {
        let db = Db::memory();
        let registry = PositionRegistry::new(db.clone());
        let position = registry.create(PositionSpec::example()).await.unwrap();
        let candidate = db
            .insert_candidate(&CandidateCore::new("Ada", "Lovelace", position.id, None))
            .await
            .unwrap();

        assert!(matches!(
            registry.delete(position.id).await,
            Err(Error::HasDependents(1))
        ));

        db.delete_candidate(candidate.id).await.unwrap();
        registry.delete(position.id).await.unwrap();
        assert!(registry.list(None).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn list_filters_by_status() {
        let registry = registry();
        registry.create(PositionSpec::example()).await.unwrap();
        let mut spec = PositionSpec::example2();
        spec.status = Some(PositionStatus::Inactive);
        registry.create(spec).await.unwrap();

        assert_eq!(registry.list(None).await.unwrap().len(), 2);
        let active = registry.list(Some(PositionStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "President");
    }
}
