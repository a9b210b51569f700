use chrono::Utc;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    options::FindOptions,
    results::InsertOneResult,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        ballot::{Ballot, NewBallot},
        candidate::{Candidate, NewCandidate},
        position::{NewPosition, Position, PositionStatus},
        voter::{NewVoter, Role, Voter},
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{BallotStore, CandidateFilter, CandidateStore, PositionStore, VoterStore};

/// The production store, backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn coll<T: crate::model::mongodb::MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }
}

/// Extract the generated ID from an insert.
fn inserted_id(result: InsertOneResult) -> Result<Id> {
    result
        .inserted_id
        .as_object_id()
        .map(Id::from)
        .ok_or_else(|| Error::Internal("Inserted document has a non-ObjectId key".to_string()))
}

fn now() -> BsonDateTime {
    BsonDateTime::from_chrono(Utc::now())
}

fn as_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::Internal(format!("Counter {value} out of range")))
}

fn candidate_filter(filter: &CandidateFilter) -> Document {
    let mut query = Document::new();
    if let Some(position) = filter.position {
        query.insert("position", position);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        // Search text is matched literally.
        let pattern = doc! { "$regex": regex::escape(search), "$options": "i" };
        query.insert(
            "$or",
            vec![
                Bson::Document(doc! { "firstName": pattern.clone() }),
                Bson::Document(doc! { "lastName": pattern }),
            ],
        );
    }
    query
}

#[rocket::async_trait]
impl PositionStore for MongoStore {
    async fn insert_position(&self, position: &NewPosition) -> Result<Position> {
        let result = self
            .coll::<NewPosition>()
            .insert_one(position, None)
            .await
            .map_err(|e| {
                if is_duplicate_key_error(&e) {
                    Error::DuplicateName(position.name.clone())
                } else {
                    e.into()
                }
            })?;
        Ok(Position {
            id: inserted_id(result)?,
            position: position.clone(),
        })
    }

    async fn find_position(&self, id: Id) -> Result<Option<Position>> {
        Ok(self.coll::<Position>().find_one(id.as_doc(), None).await?)
    }

    async fn list_positions(&self, status: Option<PositionStatus>) -> Result<Vec<Position>> {
        let filter = status.map(|status| doc! { "status": status });
        let options = FindOptions::builder()
            .sort(doc! { "order": 1, "name": 1 })
            .build();
        let positions = self
            .coll::<Position>()
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(positions)
    }

    async fn replace_position(&self, position: &Position) -> Result<bool> {
        let result = self
            .coll::<Position>()
            .replace_one(position.id.as_doc(), position, None)
            .await
            .map_err(|e| {
                if is_duplicate_key_error(&e) {
                    Error::DuplicateName(position.name.clone())
                } else {
                    e.into()
                }
            })?;
        Ok(result.matched_count > 0)
    }

    async fn delete_position(&self, id: Id) -> Result<bool> {
        let result = self
            .coll::<Position>()
            .delete_one(id.as_doc(), None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[rocket::async_trait]
impl CandidateStore for MongoStore {
    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<Candidate> {
        let result = self
            .coll::<NewCandidate>()
            .insert_one(candidate, None)
            .await?;
        Ok(Candidate {
            id: inserted_id(result)?,
            candidate: candidate.clone(),
        })
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.coll::<Candidate>().find_one(id.as_doc(), None).await?)
    }

    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let candidates = self
            .coll::<Candidate>()
            .find(candidate_filter(filter), options)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }

    async fn save_candidate_details(&self, candidate: &Candidate) -> Result<bool> {
        let update = doc! {
            "$set": {
                "firstName": &candidate.first_name,
                "lastName": &candidate.last_name,
                "profilePhoto": &candidate.profile_photo,
                "position": candidate.position,
                "updatedAt": BsonDateTime::from_chrono(candidate.updated_at),
            }
        };
        let result = self
            .coll::<Candidate>()
            .update_one(candidate.id.as_doc(), update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        let result = self
            .coll::<Candidate>()
            .delete_one(id.as_doc(), None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn count_candidates_for(&self, position: Id) -> Result<u64> {
        Ok(self
            .coll::<Candidate>()
            .count_documents(doc! { "position": position }, None)
            .await?)
    }

    async fn increment_votes(&self, ids: &[Id]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.iter().copied().map(Bson::from).collect::<Vec<_>>();
        let result = self
            .coll::<Candidate>()
            .update_many(
                doc! { "_id": { "$in": ids } },
                doc! { "$inc": { "votes": 1_i64 } },
                None,
            )
            .await?;
        Ok(result.matched_count)
    }

    async fn set_votes(&self, id: Id, votes: u64) -> Result<bool> {
        let result = self
            .coll::<Candidate>()
            .update_one(
                id.as_doc(),
                doc! { "$set": { "votes": as_i64(votes)?, "updatedAt": now() } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn reset_all_votes(&self) -> Result<u64> {
        let result = self
            .coll::<Candidate>()
            .update_many(
                doc! { "votes": { "$ne": 0_i64 } },
                doc! { "$set": { "votes": 0_i64, "updatedAt": now() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[rocket::async_trait]
impl VoterStore for MongoStore {
    async fn insert_voter(&self, voter: &NewVoter) -> Result<Voter> {
        let result = self
            .coll::<NewVoter>()
            .insert_one(voter, None)
            .await
            .map_err(|e| {
                if is_duplicate_key_error(&e) {
                    Error::DuplicateCompanyId(voter.company_id.clone())
                } else {
                    e.into()
                }
            })?;
        Ok(Voter {
            id: inserted_id(result)?,
            voter: voter.clone(),
        })
    }

    async fn find_voter(&self, id: Id) -> Result<Option<Voter>> {
        Ok(self.coll::<Voter>().find_one(id.as_doc(), None).await?)
    }

    async fn find_voter_by_company_id(&self, company_id: &str) -> Result<Option<Voter>> {
        Ok(self
            .coll::<Voter>()
            .find_one(doc! { "companyId": company_id }, None)
            .await?)
    }

    async fn list_voters(&self) -> Result<Vec<Voter>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let voters = self
            .coll::<Voter>()
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(voters)
    }

    async fn count_admins(&self) -> Result<u64> {
        Ok(self
            .coll::<Voter>()
            .count_documents(doc! { "role": Role::Admin }, None)
            .await?)
    }

    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool> {
        let result = self
            .coll::<Voter>()
            .update_one(
                id.as_doc(),
                doc! { "$set": { "passwordHash": password_hash, "updatedAt": now() } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn mark_voted(&self, id: Id) -> Result<bool> {
        let result = self
            .coll::<Voter>()
            .update_one(
                doc! { "_id": id, "hasVoted": false },
                doc! { "$set": { "hasVoted": true, "updatedAt": now() } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn reset_all_voted(&self) -> Result<u64> {
        let result = self
            .coll::<Voter>()
            .update_many(
                doc! { "hasVoted": true },
                doc! { "$set": { "hasVoted": false, "updatedAt": now() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_voters_with_role(&self, role: Role) -> Result<u64> {
        let result = self
            .coll::<Voter>()
            .delete_many(doc! { "role": role }, None)
            .await?;
        Ok(result.deleted_count)
    }
}

#[rocket::async_trait]
impl BallotStore for MongoStore {
    async fn insert_ballot(&self, ballot: &NewBallot) -> Result<Ballot> {
        let result = self
            .coll::<NewBallot>()
            .insert_one(ballot, None)
            .await
            .map_err(|e| {
                if is_duplicate_key_error(&e) {
                    Error::AlreadyVoted
                } else {
                    e.into()
                }
            })?;
        Ok(Ballot {
            id: inserted_id(result)?,
            ballot: ballot.clone(),
        })
    }

    async fn find_ballot_for_voter(&self, voter: Id) -> Result<Option<Ballot>> {
        Ok(self
            .coll::<Ballot>()
            .find_one(doc! { "voter": voter }, None)
            .await?)
    }

    async fn list_ballots(&self) -> Result<Vec<Ballot>> {
        let ballots = self
            .coll::<Ballot>()
            .find(None, None)
            .await?
            .try_collect()
            .await?;
        Ok(ballots)
    }

    async fn delete_all_ballots(&self) -> Result<u64> {
        let result = self
            .coll::<Ballot>()
            .delete_many(doc! {}, None)
            .await?;
        Ok(result.deleted_count)
    }
}
