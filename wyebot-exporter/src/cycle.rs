//! One full traversal of the location and sensor hierarchy.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{Instrument, debug, info_span};
use wyebot_api::records::Location;
use wyebot_api::{ApiError, ResourceScope, TestWindow, Transport, WyebotClient};

use crate::flatten::{self, LocationScope, SensorScope};
use crate::registry::{Recorded, RegistryError, Sample, SharedRegistry};

/// Error that ends a cycle early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Counters for the work done by one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub locations: usize,
    pub sensors: usize,
    /// Samples stored in the registry.
    pub samples: usize,
    /// Samples refused because the registry was full.
    pub dropped: usize,
    /// Series removed because this cycle no longer reported them.
    pub expired: usize,
}

/// Result of one cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleSummary),
    /// Rows published before the error stay in the registry.
    Aborted {
        error: CycleError,
        partial: CycleSummary,
    },
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }

    pub fn summary(&self) -> &CycleSummary {
        match self {
            CycleOutcome::Completed(summary) => summary,
            CycleOutcome::Aborted { partial, .. } => partial,
        }
    }
}

/// Runs collection cycles against one API client and one registry.
pub struct CycleRunner<T> {
    client: WyebotClient<T>,
    registry: SharedRegistry,
    test_results_lookback: Duration,
}

impl<T: Transport> CycleRunner<T> {
    pub fn new(
        client: WyebotClient<T>,
        registry: SharedRegistry,
        test_results_lookback: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            test_results_lookback,
        }
    }

    /// Run one traversal, stopping at the first error.
    ///
    /// A completed cycle replaces the registry contents: series it did not
    /// write are expired. An aborted cycle expires nothing.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let started = Instant::now();
        let mut summary = CycleSummary::default();
        let generation = self.registry.begin_generation();

        let result = self.traverse(&mut summary).await;
        self.registry.observe_cycle(started.elapsed());

        match result {
            Ok(()) => {
                summary.expired = self.registry.expire_before(generation);
                CycleOutcome::Completed(summary)
            }
            Err(error) => CycleOutcome::Aborted {
                error,
                partial: summary,
            },
        }
    }

    async fn traverse(&self, summary: &mut CycleSummary) -> Result<(), CycleError> {
        let locations = self.client.locations().await?;
        self.publish(summary, [flatten::location_count(locations.len())])?;

        for location in &locations {
            let span = info_span!("location", location_id = %location.location_id);
            self.collect_location(location, summary)
                .instrument(span)
                .await?;
            summary.locations += 1;
        }

        Ok(())
    }

    async fn collect_location(
        &self,
        location: &Location,
        summary: &mut CycleSummary,
    ) -> Result<(), CycleError> {
        let scope = LocationScope::from(location);
        self.publish(summary, [flatten::location(&scope)])?;

        let sensors = self.client.sensors(&location.location_id).await?;
        self.publish(summary, [flatten::sensor_count(&scope, sensors.len())])?;
        debug!(sensors = sensors.len(), "Fetched sensors");

        for sensor in &sensors {
            let sensor_scope = SensorScope::new(&scope, sensor);
            let span = info_span!("sensor", sensor_id = %sensor.sensor_id);
            self.collect_sensor(&sensor_scope, summary)
                .instrument(span)
                .await?;
            summary.sensors += 1;
        }

        let profiles = self.client.test_profiles(&location.location_id).await?;
        self.publish(summary, flatten::test_profiles(&scope, &profiles))?;

        let window = TestWindow::last(self.test_results_lookback);
        for profile in &profiles {
            let results = self
                .client
                .test_results(
                    &location.location_id,
                    &profile.network_test_profile_id,
                    &window,
                )
                .await?;
            self.publish(summary, flatten::test_results(&scope, profile, &results))?;
        }

        Ok(())
    }

    async fn collect_sensor(
        &self,
        scope: &SensorScope,
        summary: &mut CycleSummary,
    ) -> Result<(), CycleError> {
        let sensor_id = &scope.sensor_id;
        let resource = ResourceScope::sensor(&scope.location.location_id, sensor_id);

        self.publish(summary, [flatten::sensor(scope)])?;

        let info = self.client.sensor_info(sensor_id).await?;
        self.publish(summary, [flatten::sensor_data(scope, &info)])?;

        let network = self.client.sensor_network_info(sensor_id).await?;
        self.publish(summary, [flatten::network_info(scope, &network)])?;

        self.publish(summary, flatten::lldp(scope, &info))?;

        let access_points = self.client.access_points(&resource).await?;
        self.publish(summary, flatten::access_points(scope, &access_points))?;

        let clients = self.client.clients(&resource).await?;
        self.publish(summary, flatten::clients(scope, &clients))?;

        let ssids = self.client.ssids(&resource).await?;
        self.publish(summary, flatten::ssids(scope, &ssids))?;

        let issues = self.client.issues(sensor_id).await?;
        self.publish(summary, flatten::issues(scope, &issues))?;

        let rf = self.client.rf_analytics(&resource).await?;
        self.publish(summary, flatten::rf_analytics(scope, &rf))?;

        let usage = self.client.band_usage(&resource).await?;
        self.publish(summary, flatten::band_usage(scope, &usage))?;

        let bands = self.client.client_bands(&resource).await?;
        self.publish(summary, flatten::client_bands(scope, &bands))?;

        Ok(())
    }

    fn publish(
        &self,
        summary: &mut CycleSummary,
        samples: impl IntoIterator<Item = Sample>,
    ) -> Result<(), CycleError> {
        for sample in samples {
            match self.registry.record(&sample)? {
                Recorded::Stored => summary.samples += 1,
                Recorded::Dropped => summary.dropped += 1,
                Recorded::Filtered => {}
            }
        }
        Ok(())
    }
}
