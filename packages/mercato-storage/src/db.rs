use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::Result;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &mercato_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	/// Builds a pool without opening a connection. Used by test wiring where
	/// the catalog is stubbed and the pool is never polled.
	pub fn connect_lazy(cfg: &mercato_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect_lazy(&cfg.dsn)?;

		Ok(Self { pool })
	}
}
