use crate::db::models::{Comment, FlaggedComment, Post, format_timestamp, parse_timestamp};
use crate::db::schema::SQLITE_INIT;
use crate::error::BlogError;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

type SqlitePool = Pool<Sqlite>;

const COMMENT_COLUMNS: &str = "id, post_id, author_name, text, created_date, flagged";

#[derive(Clone)]
pub struct BlogStorage {
    pool: SqlitePool,
}

impl BlogStorage {
    fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, BlogError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), BlogError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        published_date: DateTime<Utc>,
    ) -> Result<Post, BlogError> {
        // stored with microsecond precision
        let published_date = published_date.trunc_subsecs(6);
        let res = sqlx::query("INSERT INTO posts (title, content, published_date) VALUES (?, ?, ?)")
            .bind(title)
            .bind(content)
            .bind(format_timestamp(&published_date))
            .execute(&self.pool)
            .await?;
        Ok(Post {
            id: res.last_insert_rowid(),
            title: title.to_string(),
            content: content.to_string(),
            published_date,
        })
    }

    /// All posts, newest first.
    pub async fn list_posts(&self) -> Result<Vec<Post>, BlogError> {
        let rows = sqlx::query(
            "SELECT id, title, content, published_date FROM posts
             ORDER BY published_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_post).collect()
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, BlogError> {
        let row = sqlx::query("SELECT id, title, content, published_date FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_post).transpose()
    }

    /// Delete a post and, through the foreign key, its comments.
    pub async fn delete_post(&self, id: i64) -> Result<bool, BlogError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn create_comment(
        &self,
        post_id: i64,
        author_name: &str,
        text: &str,
        created_date: DateTime<Utc>,
        flagged: bool,
    ) -> Result<Comment, BlogError> {
        let created_date = created_date.trunc_subsecs(6);
        let res = sqlx::query(
            "INSERT INTO comments (post_id, author_name, text, created_date, flagged)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(author_name)
        .bind(text)
        .bind(format_timestamp(&created_date))
        .bind(flagged as i64)
        .execute(&self.pool)
        .await?;
        Ok(Comment {
            id: res.last_insert_rowid(),
            post_id,
            author_name: author_name.to_string(),
            text: text.to_string(),
            created_date,
            flagged,
        })
    }

    /// Comments of one post, oldest first.
    pub async fn comments_for_post(
        &self,
        post_id: i64,
        include_flagged: bool,
    ) -> Result<Vec<Comment>, BlogError> {
        let sql = if include_flagged {
            format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?
                 ORDER BY created_date ASC, id ASC"
            )
        } else {
            format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? AND flagged = 0
                 ORDER BY created_date ASC, id ASC"
            )
        };
        let rows = sqlx::query(&sql).bind(post_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_comment).collect()
    }

    pub async fn get_comment(&self, id: i64) -> Result<Option<Comment>, BlogError> {
        let row = sqlx::query(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_comment).transpose()
    }

    /// Moderation queue, oldest first.
    pub async fn list_flagged(&self) -> Result<Vec<FlaggedComment>, BlogError> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_name, c.text, c.created_date, c.flagged,
                    p.title AS post_title
             FROM comments c JOIN posts p ON p.id = c.post_id
             WHERE c.flagged = 1
             ORDER BY c.created_date ASC, c.id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| -> Result<FlaggedComment, BlogError> {
                let post_title: String = row.try_get("post_title")?;
                Ok(FlaggedComment {
                    comment: Self::row_to_comment(row)?,
                    post_title,
                })
            })
            .collect()
    }

    pub async fn set_flagged(&self, id: i64, flagged: bool) -> Result<bool, BlogError> {
        let res = sqlx::query("UPDATE comments SET flagged = ? WHERE id = ?")
            .bind(flagged as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_comment(&self, id: i64) -> Result<bool, BlogError> {
        let res = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    fn row_to_post(row: SqliteRow) -> Result<Post, BlogError> {
        let published: String = row.try_get("published_date")?;
        Ok(Post {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            published_date: parse_timestamp(&published)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        })
    }

    fn row_to_comment(row: SqliteRow) -> Result<Comment, BlogError> {
        let created: String = row.try_get("created_date")?;
        let flagged_i: i64 = row.try_get("flagged")?;
        Ok(Comment {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            author_name: row.try_get("author_name")?,
            text: row.try_get("text")?,
            created_date: parse_timestamp(&created)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            flagged: flagged_i != 0,
        })
    }
}
