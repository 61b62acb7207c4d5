
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::DocumentRecord;
use crate::config::Config;
use crate::expander::{DocumentKind, DocumentMetadata, IndexedDocument};
use crate::{Result, SearchError};

const TABLE_PREFIX: &str = "documents_";

/// LanceDB-backed vector store with full-rebuild semantics. Each
/// rebuild writes a fresh generation table and atomically switches the
/// published table name once the new generation is complete; the old
/// generation stays queryable throughout the build and is dropped only
/// after the swap.
pub struct VectorStore {
    connection: Connection,
    live_table: RwLock<Option<String>>,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document: IndexedDocument,
    pub score: f32,
    pub seq: u32,
}

impl VectorStore {
    /// Open (or create) the vector store under the configured base
    /// directory and publish the most recent existing generation, if
    /// any. Stale generations left behind by interrupted builds are
    /// dropped.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SearchError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let connection = Self::connect(&db_path).await?;

        let mut generations = Self::generation_tables(&connection).await?;
        generations.sort();

        let live = generations.pop();
        if let Some(name) = &live {
            info!("Publishing existing index generation {}", name);
        }

        // Anything older than the newest generation is a leftover from
        // an interrupted build or an unfinished drop.
        for stale in generations {
            warn!("Dropping stale index generation {}", stale);
            if let Err(e) = connection.drop_table(&stale).await {
                warn!("Failed to drop stale generation {}: {}", stale, e);
            }
        }

        Ok(Self {
            connection,
            live_table: RwLock::new(live),
            vector_dimension: config.ollama.embedding_dimension as usize,
        })
    }

    async fn connect(db_path: &Path) -> Result<Connection> {
        let uri = format!("file://{}", db_path.display());
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to connect to LanceDB: {}", e)))
    }

    async fn generation_tables(connection: &Connection) -> Result<Vec<String>> {
        let names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to list tables: {}", e)))?;
        Ok(names
            .into_iter()
            .filter(|n| n.starts_with(TABLE_PREFIX))
            .collect())
    }

    /// Replace the entire index with a new generation built from
    /// `records`. The previously published generation remains queryable
    /// until the new one is fully written; any failure before the swap
    /// leaves it untouched. An empty record set is valid and produces
    /// an empty, searchable index.
    #[inline]
    pub async fn rebuild(&self, records: Vec<DocumentRecord>) -> Result<()> {
        for record in &records {
            if record.vector.len() != self.vector_dimension {
                return Err(SearchError::Database(format!(
                    "Record {} has vector dimension {}, expected {}",
                    record.id,
                    record.vector.len(),
                    self.vector_dimension
                )));
            }
        }

        let new_table = format!("{}{}", TABLE_PREFIX, chrono::Utc::now().timestamp_micros());
        info!(
            "Building index generation {} with {} records",
            new_table,
            records.len()
        );

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&new_table, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to create table: {}", e)))?;

        if !records.is_empty() {
            if let Err(e) = self.insert_records(&new_table, &records, schema).await {
                // Abort: remove the staging generation, keep the old one
                if let Err(drop_err) = self.connection.drop_table(&new_table).await {
                    warn!("Failed to drop aborted generation {}: {}", new_table, drop_err);
                }
                return Err(e);
            }
        }

        // Swap the published generation
        let old_table = {
            let mut live = self.live_table.write().await;
            live.replace(new_table.clone())
        };

        info!("Published index generation {}", new_table);

        if let Some(old) = old_table {
            if let Err(e) = self.connection.drop_table(&old).await {
                warn!("Failed to drop previous generation {}: {}", old, e);
            }
        }

        Ok(())
    }

    async fn insert_records(
        &self,
        table_name: &str,
        records: &[DocumentRecord],
        schema: Arc<Schema>,
    ) -> Result<()> {
        let record_batch = self.create_record_batch(records, Arc::clone(&schema))?;

        let table = self
            .connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to open table: {}", e)))?;

        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to insert records: {}", e)))?;

        debug!("Inserted {} records into {}", records.len(), table_name);
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.vector_dimension as i32,
                ),
                false,
            ),
            Field::new("seq", DataType::UInt32, false),
            Field::new("employee_id", DataType::UInt64, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("skill", DataType::Utf8, true),
            Field::new("project", DataType::Utf8, true),
            Field::new("experience_years", DataType::UInt32, false),
            Field::new("availability", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(
        &self,
        records: &[DocumentRecord],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut seqs = Vec::with_capacity(len);
        let mut employee_ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut kinds = Vec::with_capacity(len);
        let mut skills = Vec::with_capacity(len);
        let mut projects = Vec::with_capacity(len);
        let mut experience_years = Vec::with_capacity(len);
        let mut availabilities = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            let meta = &record.document.metadata;
            ids.push(record.id.as_str());
            seqs.push(record.seq);
            employee_ids.push(meta.employee_id);
            names.push(meta.name.as_str());
            kinds.push(meta.kind.as_str());
            skills.push(meta.skill.as_deref());
            projects.push(meta.project.as_deref());
            experience_years.push(meta.experience_years);
            availabilities.push(meta.availability.as_str());
            contents.push(record.document.text.as_str());
            created_ats.push(record.created_at.as_str());
        }

        let mut flat_values = Vec::with_capacity(len * self.vector_dimension);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.vector_dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| SearchError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(UInt32Array::from(seqs)),
            Arc::new(UInt64Array::from(employee_ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(kinds)),
            Arc::new(StringArray::from(skills)),
            Arc::new(StringArray::from(projects)),
            Arc::new(UInt32Array::from(experience_years)),
            Arc::new(StringArray::from(availabilities)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| SearchError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Nearest-neighbor search over the published generation using
    /// cosine similarity. An optional SQL predicate restricts the
    /// candidate set before the limit is applied, so a filtered query
    /// is never starved by unrelated top matches. Results are ordered
    /// by descending score with insertion-order tie-breaking. An
    /// unbuilt or empty index yields an empty result, not an error.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        filter_predicate: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        if query_vector.len() != self.vector_dimension {
            return Err(SearchError::Database(format!(
                "Query vector has dimension {}, expected {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        let live = { self.live_table.read().await.clone() };
        let Some(table_name) = live else {
            debug!("Search against unbuilt index, returning empty result");
            return Ok(Vec::new());
        };

        debug!(
            "Searching {} with limit {} (filter: {:?})",
            table_name, limit, filter_predicate
        );

        let table = self
            .connection
            .open_table(&table_name)
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to open table: {}", e)))?;

        // Fetch every candidate row rather than letting the engine
        // truncate: with a tied score at the limit boundary, which of
        // the tied rows survive its top-k pass is unspecified. The
        // full set is sorted with the insertion-order tie-break below
        // and truncated here, so the first-built entry always wins.
        let total_rows = table
            .count_rows(None)
            .await
            .map_err(|e| SearchError::Database(format!("Failed to count rows: {}", e)))?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| SearchError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(total_rows.max(limit));

        if let Some(predicate) = filter_predicate {
            query = query.only_if(predicate.to_string());
        }

        let results = query
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to execute search: {}", e)))?;

        let mut hits = self.parse_search_results_stream(results).await?;

        // LanceDB orders by distance; re-sort to make equal-score
        // ordering deterministic (first-built entry wins).
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.seq.cmp(&b.seq))
        });
        hits.truncate(limit);

        Ok(hits)
    }

    /// Get the total number of entries in the published generation
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let live = { self.live_table.read().await.clone() };
        let Some(table_name) = live else {
            return Ok(0);
        };

        let table = self
            .connection
            .open_table(&table_name)
            .execute()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| SearchError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Whether a generation has been published yet.
    #[inline]
    pub async fn is_built(&self) -> bool {
        self.live_table.read().await.is_some()
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| SearchError::Database(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", hits.len());
        Ok(hits)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
        fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
            batch
                .column_by_name(name)
                .ok_or_else(|| SearchError::Database(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| SearchError::Database(format!("Invalid {} column type", name)))
        }

        fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
            batch
                .column_by_name(name)
                .ok_or_else(|| SearchError::Database(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<UInt32Array>()
                .ok_or_else(|| SearchError::Database(format!("Invalid {} column type", name)))
        }

        let seqs = u32_column(batch, "seq")?;
        let employee_ids = batch
            .column_by_name("employee_id")
            .ok_or_else(|| SearchError::Database("Missing employee_id column".to_string()))?
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| SearchError::Database("Invalid employee_id column type".to_string()))?;
        let names = string_column(batch, "name")?;
        let kinds = string_column(batch, "kind")?;
        let skills = string_column(batch, "skill")?;
        let projects = string_column(batch, "project")?;
        let experience_years = u32_column(batch, "experience_years")?;
        let availabilities = string_column(batch, "availability")?;
        let contents = string_column(batch, "content")?;

        let distances = batch
            .column_by_name("_distance")
            .ok_or_else(|| SearchError::Database("Missing _distance column".to_string()))?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| SearchError::Database("Invalid _distance column type".to_string()))?;

        let mut hits = Vec::with_capacity(batch.num_rows());

        for row in 0..batch.num_rows() {
            let kind_str = kinds.value(row);
            let kind = DocumentKind::parse(kind_str).ok_or_else(|| {
                SearchError::Database(format!("Unknown document kind in index: {}", kind_str))
            })?;

            let metadata = DocumentMetadata {
                employee_id: employee_ids.value(row),
                name: names.value(row).to_string(),
                kind,
                skill: if skills.is_null(row) {
                    None
                } else {
                    Some(skills.value(row).to_string())
                },
                project: if projects.is_null(row) {
                    None
                } else {
                    Some(projects.value(row).to_string())
                },
                experience_years: experience_years.value(row),
                availability: availabilities.value(row).to_string(),
            };

            if distances.is_null(row) {
                return Err(SearchError::Database(
                    "Null _distance in search result".to_string(),
                ));
            }
            let distance = distances.value(row);

            // Cosine distance = 1 - cosine similarity
            let score = 1.0 - distance;

            hits.push(SearchHit {
                document: IndexedDocument {
                    text: contents.value(row).to_string(),
                    metadata,
                },
                score,
                seq: seqs.value(row),
            });
        }

        Ok(hits)
    }
}
