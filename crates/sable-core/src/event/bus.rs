// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// A multi-producer, single-consumer event queue.
///
/// Producers on any thread (the window thread, gameplay code) publish through
/// cloned [`sender`](Self::sender)s; the owner drains the queue once per tick.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus over an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Queues an event. The bus owns the receiver, so this only fails if the
    /// bus itself is being torn down.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to publish event: {e}");
        }
    }

    /// A sender other parts of the system can publish through.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Takes every event queued so far, in publication order.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.receiver.try_iter()
    }

    /// Whether no events are queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Resized { width: u32, height: u32 },
        Quit,
    }

    #[test]
    fn drain_preserves_order() {
        let bus = EventBus::new();
        bus.publish(TestEvent::Resized {
            width: 1,
            height: 2,
        });
        bus.publish(TestEvent::Quit);

        let events: Vec<_> = bus.drain().collect();
        assert_eq!(
            events,
            vec![
                TestEvent::Resized {
                    width: 1,
                    height: 2
                },
                TestEvent::Quit
            ]
        );
        assert!(bus.is_empty());
    }

    #[test]
    fn publish_from_thread() {
        let bus = EventBus::new();
        let sender = bus.sender();
        thread::spawn(move || sender.send(TestEvent::Quit).expect("Send should succeed"))
            .join()
            .unwrap();

        assert_eq!(bus.drain().next(), Some(TestEvent::Quit));
    }
}
