use std::collections::HashSet;
use std::path::{Path, PathBuf};

use deadpool_postgres::Pool;

use super::error::DbError;

/// Applies every `*.sql` file in `dir` that is not yet recorded in
/// `_migrations`, in file-name order, one transaction per file.
pub async fn run(pool: &Pool, dir: &Path) -> Result<(), DbError> {
    let client = pool.get().await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )",
            &[],
        )
        .await?;

    let rows = client.query("SELECT name FROM _migrations", &[]).await?;
    let applied: HashSet<String> = rows.iter().map(|row| row.get(0)).collect();
    drop(client);

    if !dir.exists() {
        tracing::info!("No migrations directory at {}, skipping migrations", dir.display());
        return Ok(());
    }

    for path in pending_files(dir)? {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if applied.contains(&name) {
            continue;
        }

        let sql = std::fs::read_to_string(&path)?;

        let mut client = pool.get().await?;
        let tx = client.transaction().await?;

        tx.batch_execute(&sql)
            .await
            .map_err(|source| DbError::MigrationError {
                name: name.clone(),
                source,
            })?;

        tx.execute("INSERT INTO _migrations (name) VALUES ($1)", &[&name])
            .await?;

        tx.commit().await?;

        tracing::info!("Applied migration: {}", name);
    }

    tracing::info!("All migrations up to date");
    Ok(())
}

fn pending_files(dir: &Path) -> Result<Vec<PathBuf>, DbError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "sql").unwrap_or(false))
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_migrations_are_sorted_sql_files() {
        let files = pending_files(Path::new("migrations")).unwrap();
        assert!(!files.is_empty());
        assert!(files.windows(2).all(|w| w[0] < w[1]));
        assert!(files
            .iter()
            .all(|p| p.extension().map(|x| x == "sql").unwrap_or(false)));
    }
}
