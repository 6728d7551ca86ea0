use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

const TIMESTAMP_BYTES: u64 = 2 * std::mem::size_of::<u64>() as u64;

enum TimerState {
    Idle,
    Submitted,
    Mapping(Receiver<Result<(), wgpu::BufferAsyncError>>),
}

/// A pair of timestamp queries around recorded GPU work.
pub struct WgpuTimer {
    pub(crate) query_set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    readback: wgpu::Buffer,
    state: TimerState,
    /// A begin timestamp is queued without its end.
    pub(crate) armed: bool,
}

impl WgpuTimer {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("gravure timer queries"),
            ty: wgpu::QueryType::Timestamp,
            count: 2,
        });
        let resolve = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gravure timer resolve"),
            size: TIMESTAMP_BYTES,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gravure timer readback"),
            size: TIMESTAMP_BYTES,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            query_set,
            resolve,
            readback,
            state: TimerState::Idle,
            armed: false,
        }
    }

    /// Whether the previous measurement is still in flight.
    pub(crate) fn busy(&self) -> bool {
        !matches!(self.state, TimerState::Idle)
    }

    /// Records the resolve and copy of both queries.
    pub(crate) fn resolve(&mut self, encoder: &mut wgpu::CommandEncoder) {
        encoder.resolve_query_set(&self.query_set, 0..2, &self.resolve, 0);
        encoder.copy_buffer_to_buffer(&self.resolve, 0, &self.readback, 0, TIMESTAMP_BYTES);
        self.state = TimerState::Submitted;
    }

    /// Polls for the result without blocking.
    pub(crate) fn poll(&mut self, device: &wgpu::Device, period_ns: f32) -> Option<Duration> {
        if let TimerState::Submitted = self.state {
            let (sender, receiver) = mpsc::channel();
            self.readback.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });
            self.state = TimerState::Mapping(receiver);
        }
        let TimerState::Mapping(receiver) = &self.state else {
            return None;
        };

        let _ = device.poll(wgpu::PollType::Poll);
        match receiver.try_recv() {
            Ok(Ok(())) => {}
            Err(TryRecvError::Empty) => return None,
            Ok(Err(err)) => {
                log::warn!("timer readback failed: {err}");
                self.state = TimerState::Idle;
                return None;
            }
            Err(TryRecvError::Disconnected) => {
                self.state = TimerState::Idle;
                return None;
            }
        }

        let ticks = {
            let data = self.readback.slice(..).get_mapped_range();
            let stamps: &[u64] = bytemuck::cast_slice(&data);
            stamps[1].saturating_sub(stamps[0])
        };
        self.readback.unmap();
        self.state = TimerState::Idle;
        Some(Duration::from_nanos((ticks as f64 * period_ns as f64) as u64))
    }
}
