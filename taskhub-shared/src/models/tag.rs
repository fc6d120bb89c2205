/// Tags attached to tasks
///
/// Tag names are unique regardless of case. The unique index
/// `unique_tag_name_case_insensitive` on `LOWER(name)` is the source of
/// truth; [`Tag::name_taken`] exists only to give a friendlier error before
/// the insert is attempted.
///
/// Tags are deleted permanently and their task associations go with them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::query::{contains_pattern, exact_pattern, paginate, visible, OrderBy, Page, PageRequest};
use crate::error::ServiceResult;

/// Name of the case-insensitive unique index on tag names
pub const UNIQUE_NAME_INDEX: &str = "unique_tag_name_case_insensitive";

/// Longest accepted tag name
pub const MAX_NAME_LENGTH: usize = 15;

/// Client-facing ordering fields
pub const ORDERING_FIELDS: &[(&str, &str)] = &[("name", "g.name"), ("created_at", "g.created_at")];

pub const DEFAULT_ORDERING: &str = "name";

/// Results returned by autocomplete
pub const AUTOCOMPLETE_LIMIT: i64 = 10;

const TAG_COLUMNS: &str = "g.id, g.uuid, g.name, g.color, g.created_by, g.updated_by, \
                           g.is_deleted, g.created_at, g.updated_at";

/// Tag row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,

    /// `#RRGGBB`
    pub color: Option<String>,

    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Tag::create`]
#[derive(Debug, Clone)]
pub struct CreateTag {
    pub name: String,
    pub color: Option<String>,
    pub created_by: i64,
}

#[derive(sqlx::FromRow)]
struct CountedTag {
    #[sqlx(flatten)]
    tag: Tag,
    total_count: i64,
}

#[derive(sqlx::FromRow)]
struct TaskTagRow {
    task_id: i64,
    #[sqlx(flatten)]
    tag: Tag,
}

/// Whether `color` is a `#RRGGBB` hex triplet
pub fn is_hex_color(color: &str) -> bool {
    let bytes = color.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

impl Tag {
    /// Inserts a tag
    ///
    /// A duplicate name surfaces as a database error on [`UNIQUE_NAME_INDEX`].
    pub async fn create(conn: &mut PgConnection, data: CreateTag) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO tags AS g (name, color, created_by, updated_by)
             VALUES ($1, $2, $3, $3)
             RETURNING {}",
            TAG_COLUMNS
        );

        sqlx::query_as::<_, Tag>(&sql)
            .bind(data.name)
            .bind(data.color)
            .bind(data.created_by)
            .fetch_one(&mut *conn)
            .await
    }

    /// Whether any tag, deleted or not, already uses `name` (ignoring case)
    pub async fn name_taken(conn: &mut PgConnection, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tags WHERE LOWER(name) = LOWER($1))")
            .bind(name)
            .fetch_one(&mut *conn)
            .await
    }

    /// Looks up a non-deleted tag
    pub async fn find_visible(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM tags g WHERE g.id = $1 AND {}",
            TAG_COLUMNS,
            visible("g")
        );

        sqlx::query_as::<_, Tag>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Looks up a tag regardless of its deleted flag
    pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM tags g WHERE g.id = $1", TAG_COLUMNS);

        sqlx::query_as::<_, Tag>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Loads the non-deleted tags among `ids`
    pub async fn find_visible_many(
        conn: &mut PgConnection,
        ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM tags g WHERE g.id = ANY($1) AND {} ORDER BY g.name",
            TAG_COLUMNS,
            visible("g")
        );

        sqlx::query_as::<_, Tag>(&sql)
            .bind(ids)
            .fetch_all(&mut *conn)
            .await
    }

    /// Non-deleted tags of each task, keyed by task id and sorted by name
    pub async fn for_tasks(
        conn: &mut PgConnection,
        task_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Tag>>, sqlx::Error> {
        let mut by_task: HashMap<i64, Vec<Tag>> = HashMap::new();
        if task_ids.is_empty() {
            return Ok(by_task);
        }

        let sql = format!(
            "SELECT tt.task_id, {}
             FROM task_tags tt
             JOIN tags g ON g.id = tt.tag_id
             WHERE tt.task_id = ANY($1) AND {}
             ORDER BY g.name, g.id",
            TAG_COLUMNS,
            visible("g")
        );

        let rows = sqlx::query_as::<_, TaskTagRow>(&sql)
            .bind(task_ids)
            .fetch_all(&mut *conn)
            .await?;

        for row in rows {
            by_task.entry(row.task_id).or_default().push(row.tag);
        }

        Ok(by_task)
    }

    /// Pages through non-deleted tags, optionally filtered by a name substring
    pub async fn list(
        conn: &mut PgConnection,
        search: Option<&str>,
        order: &OrderBy,
        page: PageRequest,
    ) -> ServiceResult<Page<Self>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {}, COUNT(*) OVER() AS total_count FROM tags g WHERE {}",
            TAG_COLUMNS,
            visible("g")
        ));

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            qb.push(" AND g.name ILIKE ").push_bind(contains_pattern(term));
        }

        qb.push(" ORDER BY ")
            .push(order.to_sql("g.id"))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<CountedTag>()
            .fetch_all(&mut *conn)
            .await?;

        Ok(paginate(page, rows, |r| r.total_count)?.map(|r| r.tag))
    }

    /// Tag suggestions for a query string
    ///
    /// An empty query returns the first tags by name; otherwise tags whose
    /// name equals the query, ignoring case. The query is not trimmed, so a
    /// whitespace-only query matches nothing.
    pub async fn autocomplete(conn: &mut PgConnection, query: &str) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM tags g
             WHERE {} AND ($1 = '' OR g.name ILIKE $2)
             ORDER BY g.name, g.id
             LIMIT $3",
            TAG_COLUMNS,
            visible("g")
        );

        sqlx::query_as::<_, Tag>(&sql)
            .bind(query)
            .bind(exact_pattern(query))
            .bind(AUTOCOMPLETE_LIMIT)
            .fetch_all(&mut *conn)
            .await
    }

    /// Permanently removes a tag and its task associations
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
