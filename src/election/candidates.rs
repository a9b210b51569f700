use chrono::Utc;
use log::info;

use crate::error::{Error, Result};
use crate::model::{
    api::candidate::{CandidatePatch, CandidateSpec},
    db::candidate::{title_case, Candidate, NewCandidate},
    mongodb::Id,
};
use crate::store::{store_guard, CandidateFilter, Db};

use super::positions::non_blank;

/// Candidates standing for positions.
pub struct CandidateRegistry {
    db: Db,
}

store_guard!(CandidateRegistry);

impl CandidateRegistry {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn ensure_position_exists(&self, position: Id) -> Result<()> {
        match self.db.find_position(position).await? {
            Some(_) => Ok(()),
            None => Err(Error::PositionNotFound(position)),
        }
    }

    pub async fn create(&self, spec: CandidateSpec) -> Result<Candidate> {
        let first_name = non_blank(spec.first_name).ok_or(Error::MissingField("firstName"))?;
        let last_name = non_blank(spec.last_name).ok_or(Error::MissingField("lastName"))?;
        let position: Id = spec.position.ok_or(Error::MissingField("position"))?.into();
        self.ensure_position_exists(position).await?;

        let candidate = NewCandidate::new(
            &first_name,
            &last_name,
            position,
            non_blank(spec.profile_photo),
        );
        let candidate = self.db.insert_candidate(&candidate).await?;
        info!(
            "Created candidate {} ({}) for position {position}",
            candidate.full_name(),
            candidate.id
        );
        Ok(candidate)
    }

    pub async fn get(&self, id: Id) -> Result<Candidate> {
        self.db
            .find_candidate(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
    }

    pub async fn list(&self, filter: CandidateFilter) -> Result<Vec<Candidate>> {
        let filter = CandidateFilter {
            search: non_blank(filter.search),
            ..filter
        };
        self.db.list_candidates(&filter).await
    }

    /// Apply a partial update. Blank names are ignored; the vote counter is never touched.
    pub async fn update(&self, id: Id, patch: CandidatePatch) -> Result<Candidate> {
        let mut candidate = self.get(id).await?;

        if let Some(first_name) = non_blank(patch.first_name) {
            candidate.first_name = title_case(&first_name);
        }
        if let Some(last_name) = non_blank(patch.last_name) {
            candidate.last_name = title_case(&last_name);
        }
        if let Some(position) = patch.position {
            let position: Id = position.into();
            if position != candidate.position {
                self.ensure_position_exists(position).await?;
                candidate.position = position;
            }
        }
        if let Some(photo) = non_blank(patch.profile_photo) {
            candidate.profile_photo = photo;
        }
        candidate.updated_at = Utc::now();

        if !self.db.save_candidate_details(&candidate).await? {
            return Err(Error::not_found(format!("Candidate {id}")));
        }
        info!("Updated candidate {} ({id})", candidate.full_name());
        Ok(candidate)
    }

    pub async fn delete(&self, id: Id) -> Result<()> {
        if !self.db.delete_candidate(id).await? {
            return Err(Error::not_found(format!("Candidate {id}")));
        }
        info!("Deleted candidate {id}");
        Ok(())
    }
}
