use ipctxn_parcel::DEFAULT_MAX_PARCEL_SIZE;

/// Limits shared by both portals of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalConfig {
    /// Largest capacity a put may reserve.
    pub max_parcel_size: usize,
    /// Maximum number of parcels queued for get on one portal.
    pub max_queued_parcels: usize,
    /// Maximum total bytes queued for get on one portal.
    pub max_queued_bytes: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            max_parcel_size: DEFAULT_MAX_PARCEL_SIZE,
            max_queued_parcels: 1024,
            max_queued_bytes: 64 * 1024 * 1024,
        }
    }
}
