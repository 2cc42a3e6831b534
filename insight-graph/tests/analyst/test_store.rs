//! Read-only SQL store against a fixture database

use insight_graph::store::{check_read_only, SqlStore};

use super::common::{cleanup_temp_dir, create_retail_db, create_temp_dir, retail_tables};

#[test]
fn test_default_include_list_hides_other_tables() {
    let dir = create_temp_dir("store_include");
    let db = create_retail_db(&dir);

    let store = SqlStore::open(&db, Some(retail_tables())).unwrap();
    assert_eq!(
        store.list_tables().unwrap(),
        vec!["customer_feedback", "sales_data", "stores"]
    );
    assert!(store.table_info("audit_log").is_err());

    cleanup_temp_dir(&dir);
}

#[test]
fn test_daily_revenue_query() {
    let dir = create_temp_dir("store_daily");
    let db = create_retail_db(&dir);
    let store = SqlStore::open(&db, None).unwrap();

    let result = store
        .query(
            "SELECT DATE(Date) AS Date, SUM(Revenue) AS Revenue FROM sales_data GROUP BY DATE(Date) ORDER BY Date",
            200,
        )
        .unwrap();
    assert_eq!(
        result.to_csv().unwrap(),
        "Date,Revenue\n2024-01-01,9.5\n2024-01-02,9.75\n2024-01-03,14.0"
    );

    cleanup_temp_dir(&dir);
}

#[test]
fn test_guard_rejects_writes_and_batches() {
    assert!(check_read_only("INSERT INTO stores VALUES ('S9', 'Nowhere')").is_err());
    assert!(check_read_only("SELECT 1; SELECT 2").is_err());
    assert!(check_read_only("PRAGMA table_info(stores)").is_err());

    let dir = create_temp_dir("store_guard");
    let db = create_retail_db(&dir);
    let store = SqlStore::open(&db, None).unwrap();
    assert!(store.query("DELETE FROM stores", 10).is_err());
    assert_eq!(store.query("SELECT COUNT(*) AS n FROM stores", 10).unwrap().rows[0], vec!["3"]);

    cleanup_temp_dir(&dir);
}
