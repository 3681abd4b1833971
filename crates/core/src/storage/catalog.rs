//! Service and plan catalog storage operations

use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::OptionalExt;
use crate::error::Result;
use crate::models::{Plan, PlanKey, Service, ServiceId};

pub struct CatalogStore<'a> {
    conn: &'a Connection,
}

impl<'a> CatalogStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or refresh a service and its plans
    #[instrument(skip(self, service), fields(service_id = service.id, plans = service.plans.len()))]
    pub fn upsert_service(&self, service: &Service) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO services (service_id, name) VALUES (?1, ?2)
             ON CONFLICT(service_id) DO UPDATE SET name = excluded.name",
            params![service.id, service.name],
        )?;
        for plan in &service.plans {
            tx.execute(
                "INSERT INTO plans (service_id, plan_name, cost, max_count) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(service_id, plan_name)
                 DO UPDATE SET cost = excluded.cost, max_count = excluded.max_count",
                params![service.id, plan.name, plan.cost, plan.max_count],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// List services ordered by id, each with its plans
    #[instrument(skip(self))]
    pub fn list_services(&self) -> Result<Vec<Service>> {
        let mut stmt = self
            .conn
            .prepare("SELECT service_id, name FROM services ORDER BY service_id")?;
        let mut services = stmt
            .query_map([], |row| {
                Ok(Service {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    plans: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut plan_stmt = self.conn.prepare(
            "SELECT plan_name, cost, max_count FROM plans WHERE service_id = ?1 ORDER BY cost",
        )?;
        for service in &mut services {
            service.plans = plan_stmt
                .query_map(params![service.id], |row| {
                    Ok(Plan {
                        name: row.get(0)?,
                        cost: row.get(1)?,
                        max_count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
        }

        Ok(services)
    }

    /// Find a plan by key
    #[instrument(skip(self), fields(plan = %key))]
    pub fn find_plan(&self, key: &PlanKey) -> Result<Option<Plan>> {
        let plan = self
            .conn
            .query_row(
                "SELECT plan_name, cost, max_count FROM plans
                 WHERE service_id = ?1 AND plan_name = ?2",
                params![key.service_id, key.plan_name],
                |row| {
                    Ok(Plan {
                        name: row.get(0)?,
                        cost: row.get(1)?,
                        max_count: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(plan)
    }

    /// Service display name
    #[instrument(skip(self))]
    pub fn service_name(&self, service_id: ServiceId) -> Result<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM services WHERE service_id = ?1",
                params![service_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(name)
    }
}
