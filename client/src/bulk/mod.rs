mod bulk_transfers;

pub use bulk_transfers::BulkTransfers;
