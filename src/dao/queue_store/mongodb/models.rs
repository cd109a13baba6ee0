use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{CallEntity, CallKind, CounterEntity, OrganizationEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCallDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    number: u32,
    counter_id: Uuid,
    counter_name: String,
    organization_id: Uuid,
    kind: CallKind,
    created_at: DateTime,
}

impl From<CallEntity> for MongoCallDocument {
    fn from(value: CallEntity) -> Self {
        Self {
            id: value.id,
            number: value.number,
            counter_id: value.counter_id,
            counter_name: value.counter_name,
            organization_id: value.organization_id,
            kind: value.kind,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoCallDocument> for CallEntity {
    fn from(value: MongoCallDocument) -> Self {
        Self {
            id: value.id,
            number: value.number,
            counter_id: value.counter_id,
            counter_name: value.counter_name,
            organization_id: value.organization_id,
            kind: value.kind,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCounterDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    organization_id: Uuid,
    active: bool,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<CounterEntity> for MongoCounterDocument {
    fn from(value: CounterEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            organization_id: value.organization_id,
            active: value.active,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoCounterDocument> for CounterEntity {
    fn from(value: MongoCounterDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            organization_id: value.organization_id,
            active: value.active,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOrganizationDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    owner_email: String,
    max_count: u32,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<OrganizationEntity> for MongoOrganizationDocument {
    fn from(value: OrganizationEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_email: value.owner_email,
            max_count: value.max_count,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoOrganizationDocument> for OrganizationEntity {
    fn from(value: MongoOrganizationDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_email: value.owner_email,
            max_count: value.max_count,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
