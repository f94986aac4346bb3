use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Database, IndexModel,
};

/// Creates the indexes the write paths rely on. Uniqueness for
/// applications and gateway orders is enforced here, at the store level,
/// so concurrent writers race on the index instead of on a pre-check.
pub async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<Document>("users")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    db.collection::<Document>("transactions")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "order_id": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    db.collection::<Document>("customers")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "user": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    // One live application per (post, applicant) pair
    db.collection::<Document>("room_sharing_applications")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "room_sharing": 1, "applicant": 1 })
                .options(unique)
                .build(),
        )
        .await?;

    // Browse queries filter on status; owner dashboards filter on owner
    db.collection::<Document>("room_sharings")
        .create_index(IndexModel::builder().keys(doc! { "status": 1 }).build())
        .await?;

    db.collection::<Document>("bookings")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "owner": 1, "payment_status": 1 })
                .build(),
        )
        .await?;

    tracing::info!("✅ MongoDB indexes ensured");
    Ok(())
}
