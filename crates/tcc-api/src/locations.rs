// Location discovery
//
// The location list is paged. The portal reports at most a handful of
// pages per account, so discovery stops after `MAX_LOCATION_PAGES` or at
// the first empty page, whichever comes first.

use reqwest::Method;
use tracing::debug;

use crate::client::TccClient;
use crate::error::Error;
use crate::models::LocationRecord;

/// Upper bound on location-list pages walked by [`TccClient::list_locations`].
pub const MAX_LOCATION_PAGES: u32 = 4;

impl TccClient {
    /// List every location on the account along with its devices.
    ///
    /// `GET /portal/Location/GetLocationListData/?page={n}&filter=`
    pub async fn list_locations(&self) -> Result<Vec<LocationRecord>, Error> {
        let mut locations = Vec::new();

        for page in 1..=MAX_LOCATION_PAGES {
            debug!(page, "listing locations");
            let path = format!("/portal/Location/GetLocationListData/?page={page}&filter=");
            let batch: Vec<LocationRecord> = self.request(Method::GET, &path, None).await?;
            if batch.is_empty() {
                break;
            }
            locations.extend(batch);
        }

        debug!(count = locations.len(), "locations discovered");
        Ok(locations)
    }
}
