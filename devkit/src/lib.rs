/*!
# UniNet DevKit - Serveur de statut simulé et fixtures

Bibliothèque facilitant les tests de la synchro du parc avec:
- Un faux serveur de statut HTTP (liveness + roster) sur un port éphémère
- Des builders de snapshots JSON
- Des utilitaires d'attente pour les tâches asynchrones
*/

pub mod fixtures;
pub mod mock_server;
pub mod test_utils;

pub use fixtures::{LivenessBuilder, RosterBuilder};
pub use mock_server::MockStatusServer;
pub use test_utils::{init_logging, wait_until};
