use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::fetch;
use crate::state::{Delta, ProviderCommand};

/// Runs all network I/O on one worker thread. Commands are handled
/// sequentially: the engine's single-flight guard admits at most one
/// outstanding page fetch, so responses arrive in request order without any
/// extra bookkeeping here.
pub fn spawn_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        for cmd in cmd_rx.iter() {
            match cmd {
                ProviderCommand::FetchPage(ticket) => {
                    let pairs = ticket.query.query_pairs();
                    match fetch::fetch_replay_page(&pairs) {
                        Ok(batch) => {
                            let _ = tx.send(Delta::PageLoaded {
                                epoch: ticket.epoch,
                                page: ticket.page,
                                batch,
                            });
                        }
                        Err(failure) => {
                            let _ = tx.send(Delta::PageFailed {
                                epoch: ticket.epoch,
                                page: ticket.page,
                                failure,
                            });
                        }
                    }
                }
                ProviderCommand::FetchCharacterIcons => match fetch::fetch_character_icons() {
                    Ok(icons) => {
                        let _ = tx.send(Delta::SetCharacterIcons(icons));
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!("[WARN] Icon fetch error: {err}")));
                    }
                },
            }
        }
    });
}
