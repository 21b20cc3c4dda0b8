use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::*;
use crate::db::{Collection, Database};
use crate::error::ShopError;
use crate::ids::SequentialIds;
use crate::models::appointment::{hhmm, CreateAppointment};
use crate::models::quotation::{DraftFromWorkOrder, QuotationPatch};
use crate::models::work_order::{AddPart, AddService, CreateWorkOrder};
use crate::models::{AppointmentState, InventoryItem, LaborCatalogItem, WorkOrderState};

async fn seed(db: &Database) {
    let mut tx = db.inventory.begin().await;
    tx.insert(InventoryItem {
        code: "P1".into(),
        name: "Brake pad".into(),
        description: String::new(),
        quantity: 5,
        unit_price: Decimal::from(100),
        vehicle_id: None,
    })
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.labor_catalog.begin().await;
    tx.insert(LaborCatalogItem {
        code: "L1".into(),
        name: "Brake service".into(),
        description: String::new(),
        unit_price: Decimal::from(1000),
    })
    .unwrap();
    tx.commit().await.unwrap();
}

fn workshop(db: &Database) -> Workshop {
    let directory = Arc::new(
        StaticDirectory::default()
            .with_client("1-111", "Carla Mora")
            .with_client("2-222", "Diego Solis")
            .with_vehicle("AAA111", "1-111", None)
            .with_vehicle("BBB222", "2-222", None)
            .with_user("Ana", "mechanic"),
    );
    Workshop::new(
        db,
        directory.clone(),
        directory,
        Arc::new(SequentialIds::starting_at(1)),
    )
}

fn booking(client: &str, plate: &str, time: &str) -> CreateAppointment {
    CreateAppointment {
        client_id: client.into(),
        vehicle_plate: plate.into(),
        date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        time: hhmm::parse(time).unwrap(),
        description: "brake noise".into(),
        replace_active: false,
    }
}

/// Booking through proforma, the whole way a job moves through the shop.
#[tokio::test]
async fn test_job_lifecycle() {
    let db = Database::in_memory();
    seed(&db).await;
    let shop = workshop(&db);

    let appt = shop.scheduler.create(booking("1-111", "AAA111", "09:00")).await.unwrap();
    let appt = shop.scheduler.assign_mechanic(appt.id, "Ana").await.unwrap();
    assert_eq!(appt.state, AppointmentState::Accepted);

    let order = shop
        .work_orders
        .create_from_appointment(CreateWorkOrder {
            appointment_id: appt.id,
            initial_observations: "pads worn".into(),
            mechanic: None,
        })
        .await
        .unwrap();
    assert!(matches!(
        shop.work_orders
            .create_from_appointment(CreateWorkOrder {
                appointment_id: appt.id,
                initial_observations: String::new(),
                mechanic: None,
            })
            .await,
        Err(ShopError::DuplicateWorkOrder(_))
    ));

    let code = order.code_order.clone();
    shop.work_orders
        .add_part(&code, AddPart { part_code: "P1".into(), quantity: 2 })
        .await
        .unwrap();
    shop.work_orders
        .add_service(&code, AddService { labor_code: "L1".into() })
        .await
        .unwrap();
    shop.work_orders.set_state(&code, WorkOrderState::Finished).await.unwrap();
    assert_eq!(shop.ledger.part("P1").await.unwrap().quantity, 3);

    let draft = shop
        .quotations
        .draft_from_work_order(
            &code,
            DraftFromWorkOrder {
                labor_discount_percent: Some(Decimal::from(10)),
            },
        )
        .await
        .unwrap();
    assert_eq!(draft.work_order_code.as_deref(), Some(code.as_str()));
    assert_eq!(draft.client_name, "Carla Mora");
    assert_eq!(draft.totals.parts_subtotal, Decimal::from(200));
    assert_eq!(draft.totals.labor_subtotal, Decimal::from(1000));
    assert_eq!(draft.totals.taxable_base, Decimal::from(1100));
    assert_eq!(draft.totals.total, Decimal::from(1243));

    // drafting does not touch stock
    assert_eq!(shop.ledger.part("P1").await.unwrap().quantity, 3);

    shop.quotations.convert_to_proforma(&draft.code).await.unwrap();
    assert!(matches!(
        shop.quotations.update(&draft.code, QuotationPatch::default()).await,
        Err(ShopError::ProformaImmutable(_))
    ));
    assert!(matches!(
        shop.quotations.delete(&draft.code).await,
        Err(ShopError::ProformaImmutable(_))
    ));
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let (appt_id, order_code) = {
        let db = Database::open(dir.path()).await.unwrap();
        seed(&db).await;
        let shop = workshop(&db);
        let appt = shop.scheduler.create(booking("2-222", "BBB222", "14:00")).await.unwrap();
        shop.scheduler.assign_mechanic(appt.id, "Ana").await.unwrap();
        let order = shop
            .work_orders
            .create_from_appointment(CreateWorkOrder {
                appointment_id: appt.id,
                initial_observations: String::new(),
                mechanic: None,
            })
            .await
            .unwrap();
        shop.work_orders
            .add_part(&order.code_order, AddPart { part_code: "P1".into(), quantity: 4 })
            .await
            .unwrap();
        (appt.id, order.code_order)
    };

    let db = Database::open(dir.path()).await.unwrap();
    let shop = workshop(&db);
    assert_eq!(shop.ledger.part("P1").await.unwrap().quantity, 1);
    assert_eq!(shop.scheduler.get(appt_id).await.unwrap().mechanic, "Ana");
    assert_eq!(shop.work_orders.get(&order_code).await.unwrap().parts_used.len(), 1);
}

#[tokio::test]
async fn test_concurrent_work_orders_share_stock() {
    let db = Database::in_memory();
    seed(&db).await;
    let shop = workshop(&db);

    let mut codes = Vec::new();
    for (client, plate, time) in [("1-111", "AAA111", "08:00"), ("2-222", "BBB222", "12:00")] {
        let appt = shop.scheduler.create(booking(client, plate, time)).await.unwrap();
        shop.scheduler.assign_mechanic(appt.id, "Ana").await.unwrap();
        let order = shop
            .work_orders
            .create_from_appointment(CreateWorkOrder {
                appointment_id: appt.id,
                initial_observations: String::new(),
                mechanic: None,
            })
            .await
            .unwrap();
        codes.push(order.code_order);
    }

    let mut handles = Vec::new();
    for code in codes {
        let engine = shop.work_orders.clone();
        handles.push(tokio::spawn(async move {
            engine
                .add_part(&code, AddPart { part_code: "P1".into(), quantity: 3 })
                .await
                .is_ok()
        }));
    }
    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(shop.ledger.part("P1").await.unwrap().quantity, 2);
}

#[tokio::test]
async fn test_reports_land_in_the_audit_collection() {
    let reports = Arc::new(Collection::in_memory(Vec::new()));
    let sink: Arc<dyn ReportSink> = Arc::new(StoredReports::new(reports.clone()));
    sink.submit(UNAUTHORIZED_ATTEMPT, "Ana", "tried to delete P1", chrono::Utc::now())
        .await;
    assert_eq!(reports.list().await.len(), 1);
}
