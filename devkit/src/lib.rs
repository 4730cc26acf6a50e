/*!
# Data Hub DevKit - Stubs et utilitaires pour le développement

Bibliothèque facilitant les tests du publisher sans data hub réel:
- Mock HTTP du data hub (enregistre les requêtes, statut et latence configurables)
- Harness de tests avec assertions sur les payloads reçus
- Builders de payloads conformes au contrat télémétrie
*/

pub mod hub_stub;
pub mod test_utils;

pub use hub_stub::{MockDataHub, RecordedRequest, TelemetryPayloadBuilder, TELEMETRY_PATH};
pub use test_utils::TestHarness;
