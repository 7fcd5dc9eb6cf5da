// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Controle RFID", description = "Etiquetas, empréstimos e inventários de ferramentas"),
    paths(
        // --- Etiquetas ---
        handlers::tags::list_tags,
        handlers::tags::get_tag,
        handlers::tags::get_tag_photo,
        handlers::tags::create_tag,
        handlers::tags::update_tag,
        handlers::tags::destroy_tag,
        handlers::tags::restore_tag,
        handlers::tags::tag_statistics,

        // --- Empréstimos ---
        handlers::loans::create_loan,
        handlers::loans::get_loan,
        handlers::loans::return_loan,
        handlers::loans::list_loans,
        handlers::loans::active_by_collaborator,
        handlers::loans::tool_history,
        handlers::loans::tool_availability,
        handlers::loans::loan_statistics,
        handlers::loans::pending_loans,

        // --- Inventários ---
        handlers::inventories::create_inventory,
        handlers::inventories::list_inventories,
        handlers::inventories::get_inventory,
        handlers::inventories::list_items,
        handlers::inventories::update_item,
        handlers::inventories::process_csv,
        handlers::inventories::finalize_inventory,
        handlers::inventories::inventory_statistics,
        handlers::inventories::latest_inventory,
        handlers::inventories::csv_template,
        handlers::inventories::export_inventory,

        // --- Leituras ---
        handlers::reads::ingest_reads,
        handlers::reads::list_reads,
        handlers::reads::read_statistics,
        handlers::reads::reads_by_tag,
        handlers::reads::recent_reads,

        // --- Ping ---
        handlers::pings::list_pings,
        handlers::pings::ping_statistics,
        handlers::pings::pings_by_tag,
        handlers::pings::recent_pings,
        handlers::pings::list_antennas,
        handlers::pings::photo_at,
        handlers::pings::latest_photo,
        handlers::pings::photo_info,
    ),
    components(
        schemas(
            // --- Etiquetas ---
            models::tag::Tag,
            models::tag::TagStatistics,
            handlers::tags::CreateTagPayload,
            handlers::tags::UpdateTagPayload,

            // --- Empréstimos ---
            models::loan::Loan,
            models::loan::LoanStatistics,
            models::loan::ToolUsage,
            models::loan::CollaboratorLoans,
            models::loan::AvailabilityReason,
            models::loan::ToolAvailability,
            models::loan::PendingLoan,
            handlers::loans::CreateLoanPayload,
            handlers::loans::ReturnLoanPayload,

            // --- Inventários ---
            models::inventory::InventoryStatus,
            models::inventory::ItemStatus,
            models::inventory::LocationOrigin,
            models::inventory::Inventory,
            models::inventory::InventorySummary,
            models::inventory::InventoryItem,
            models::inventory::ItemCounts,
            models::inventory::InventoryDetails,
            models::inventory::InventoryItems,
            models::inventory::CsvReconciliation,
            models::inventory::CollaboratorInventories,
            models::inventory::InventoryStatistics,
            handlers::inventories::CreateInventoryPayload,
            handlers::inventories::CsvContentPayload,
            handlers::inventories::UpdateItemPayload,

            // --- Leituras ---
            models::read::Read,
            models::read::ReadStatistics,
            models::read::RecentReads,
            handlers::reads::ReadPayload,
            handlers::reads::IngestPayload,
            handlers::reads::IngestResponse,

            // --- Ping ---
            models::ping::Ping,
            models::ping::PingStatistics,
            models::ping::Period,
            models::ping::RecentPings,
            models::ping::ReaderAntennas,
            models::ping::PhotoInfo,
        )
    ),
    tags(
        (name = "Etiquetas", description = "Cadastro das etiquetas RFID das ferramentas"),
        (name = "Empréstimos", description = "Retirada e devolução de ferramentas"),
        (name = "Inventários", description = "Conferência do almoxarifado"),
        (name = "Leituras", description = "Leituras brutas das antenas"),
        (name = "Ping", description = "Sinais periódicos e fotos dos leitores")
    )
)]
pub struct ApiDoc;
