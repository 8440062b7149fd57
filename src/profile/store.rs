//! SQLite-backed customer profile store
//!
//! Schema follows the external relational contract: pets carry a JSON array
//! of allergy tags, preferences are unique per customer and key with
//! overwrite-on-rewrite semantics.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::errors::Result;
use crate::intent::PetType;
use crate::profile::{PetProfile, ProfileStore};

/// Profile store over a local SQLite database
pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    /// Open (and initialize) the database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, for tests and ephemeral runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS pets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id TEXT NOT NULL,
                name TEXT,
                pet_type TEXT,
                allergies TEXT NOT NULL DEFAULT '[]',
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_pets_customer ON pets(customer_id);

            CREATE TABLE IF NOT EXISTS preferences (
                customer_id TEXT NOT NULL,
                preference_key TEXT NOT NULL,
                preference_value TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(customer_id, preference_key)
            );",
        )?;
        Ok(())
    }
}

impl ProfileStore for SqliteProfileStore {
    fn pets(&self, customer_id: &str) -> Result<Vec<PetProfile>> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        let mut stmt =
            conn.prepare("SELECT name, pet_type, allergies FROM pets WHERE customer_id = ?1")?;

        let rows = stmt.query_map(params![customer_id], |row| {
            let name: Option<String> = row.get(0)?;
            let pet_type: Option<String> = row.get(1)?;
            let allergies_json: String = row.get(2)?;
            Ok((name, pet_type, allergies_json))
        })?;

        let mut pets = Vec::new();
        for row in rows {
            let (name, pet_type, allergies_json) = row?;
            let allergies: Vec<String> =
                serde_json::from_str(&allergies_json).unwrap_or_default();
            pets.push(PetProfile {
                name,
                pet_type: pet_type.as_deref().and_then(PetType::parse),
                allergies,
            });
        }
        Ok(pets)
    }

    fn preferences(&self, customer_id: &str) -> Result<HashMap<String, String>> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT preference_key, preference_value FROM preferences WHERE customer_id = ?1",
        )?;

        let rows = stmt.query_map(params![customer_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut preferences = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            preferences.insert(key, value);
        }
        Ok(preferences)
    }

    fn add_pet_allergy(
        &self,
        customer_id: &str,
        pet_type: Option<PetType>,
        allergen: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        let pet_type_str = pet_type.map(|p| p.as_str().to_string());

        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, allergies FROM pets
                 WHERE customer_id = ?1 AND pet_type IS ?2
                 LIMIT 1",
                params![customer_id, pet_type_str],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, allergies_json)) => {
                let mut allergies: Vec<String> =
                    serde_json::from_str(&allergies_json).unwrap_or_default();
                if allergies.iter().any(|a| a == allergen) {
                    // Already recorded: saving twice is a no-op
                    return Ok(());
                }
                allergies.push(allergen.to_string());
                conn.execute(
                    "UPDATE pets SET allergies = ?1 WHERE id = ?2",
                    params![serde_json::to_string(&allergies)?, id],
                )?;
            }
            None => {
                conn.execute(
                    "INSERT INTO pets (customer_id, pet_type, allergies) VALUES (?1, ?2, ?3)",
                    params![
                        customer_id,
                        pet_type_str,
                        serde_json::to_string(&vec![allergen.to_string()])?
                    ],
                )?;
            }
        }
        Ok(())
    }

    fn set_preference(&self, customer_id: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        conn.execute(
            "INSERT INTO preferences (customer_id, preference_key, preference_value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(customer_id, preference_key)
             DO UPDATE SET preference_value = excluded.preference_value,
                           updated_at = CURRENT_TIMESTAMP",
            params![customer_id, key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteProfileStore {
        SqliteProfileStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_empty_customer_has_no_pets() {
        assert!(store().pets("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_add_allergy_creates_pet_row() {
        let s = store();
        s.add_pet_allergy("cust1", Some(PetType::Dog), "chicken").unwrap();

        let pets = s.pets("cust1").unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].pet_type, Some(PetType::Dog));
        assert_eq!(pets[0].allergies, vec!["chicken"]);
    }

    #[test]
    fn test_add_allergy_appends_to_existing_pet() {
        let s = store();
        s.add_pet_allergy("cust1", Some(PetType::Dog), "chicken").unwrap();
        s.add_pet_allergy("cust1", Some(PetType::Dog), "salmon").unwrap();

        let pets = s.pets("cust1").unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].allergies, vec!["chicken", "salmon"]);
    }

    #[test]
    fn test_add_same_allergy_twice_is_noop() {
        let s = store();
        s.add_pet_allergy("cust1", Some(PetType::Dog), "chicken").unwrap();
        s.add_pet_allergy("cust1", Some(PetType::Dog), "chicken").unwrap();

        let pets = s.pets("cust1").unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].allergies, vec!["chicken"]);
    }

    #[test]
    fn test_preference_overwrites_not_appends() {
        let s = store();
        s.set_preference("cust1", "budget_max", "50").unwrap();
        s.set_preference("cust1", "budget_max", "75").unwrap();

        let prefs = s.preferences("cust1").unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs.get("budget_max").map(String::as_str), Some("75"));
    }

    #[test]
    fn test_customers_are_isolated() {
        let s = store();
        s.add_pet_allergy("a", Some(PetType::Dog), "chicken").unwrap();
        s.add_pet_allergy("b", Some(PetType::Cat), "salmon").unwrap();

        assert_eq!(s.pets("a").unwrap().len(), 1);
        assert_eq!(s.pets("b").unwrap()[0].allergies, vec!["salmon"]);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles").join("customers.db");

        let s = SqliteProfileStore::open(&path).unwrap();
        s.add_pet_allergy("cust1", None, "grain").unwrap();

        assert!(path.exists());
        assert_eq!(s.pets("cust1").unwrap()[0].allergies, vec!["grain"]);
    }
}
