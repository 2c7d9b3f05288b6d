use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
		Query, QueryPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder, value::Kind,
	},
};
use uuid::Uuid;

use crate::Result;
use paperchat_domain::Chunk;

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &paperchat_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
					VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
				),
			)
			.await?;

		Ok(())
	}

	/// Writes one document's chunk vectors. Point ids are derived from the
	/// document id and chunk index, so re-indexing overwrites in place.
	pub async fn upsert_chunks(
		&self,
		owner_id: &str,
		document_id: Uuid,
		chunks: &[Chunk],
		vectors: &[Vec<f32>],
	) -> Result<()> {
		let mut points = Vec::with_capacity(chunks.len());

		for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
			let mut payload_map = HashMap::new();

			payload_map.insert("document_id".to_string(), Value::from(document_id.to_string()));
			payload_map.insert("owner_id".to_string(), Value::from(owner_id.to_string()));
			payload_map.insert("chunk_index".to_string(), Value::from(chunk.index as i64));
			payload_map.insert("text".to_string(), Value::from(chunk.text.clone()));

			points.push(PointStruct::new(
				chunk_point_id(document_id, chunk.index).to_string(),
				vector.clone(),
				Payload::from(payload_map),
			));
		}

		let upsert = UpsertPointsBuilder::new(self.collection.clone(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	/// Nearest chunks within one document's namespace, best match first.
	pub async fn search_document(
		&self,
		document_id: Uuid,
		vector: Vec<f32>,
		limit: u32,
	) -> Result<Vec<String>> {
		let filter = Filter::must([Condition::matches("document_id", document_id.to_string())]);
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.filter(filter)
			.limit(limit as u64)
			.with_payload(true);
		let response = self.client.query(search).await?;
		let texts = response
			.result
			.into_iter()
			.filter_map(|point| {
				point.payload.get("text").and_then(|value| match &value.kind {
					Some(Kind::StringValue(text)) => Some(text.clone()),
					_ => None,
				})
			})
			.collect();

		Ok(texts)
	}

	/// Drops every point belonging to `document_id`. Idempotent; a namespace
	/// with no points is not an error.
	pub async fn delete_document_points(&self, document_id: Uuid) -> Result<()> {
		let filter = Filter::must([Condition::matches("document_id", document_id.to_string())]);
		let delete = DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true);

		match self.client.delete_points(delete).await {
			Ok(_) => Ok(()),
			Err(err) if is_not_found_error(&err) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

pub fn chunk_point_id(document_id: Uuid, chunk_index: i32) -> Uuid {
	let name = format!("{document_id}:{chunk_index}");

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

fn is_not_found_error(err: &qdrant_client::QdrantError) -> bool {
	let message = err.to_string().to_lowercase();
	let point_not_found =
		(message.contains("not found") || message.contains("404")) && message.contains("point");
	let no_point_found = message.contains("no point") && message.contains("found");

	point_not_found || no_point_found
}
