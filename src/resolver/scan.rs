use crate::layout::{decode_u256, LayoutConvention};
use crate::onchain::{SourceError, StorageReader};
use alloy_primitives::{Address, B256, U256};
use futures_util::{stream, StreamExt, TryStreamExt};
use std::pin::pin;
use tracing::{debug, trace};

/// A candidate slot whose stored word equals the oracle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotMatch {
    pub index: u64,
    pub layout: LayoutConvention,
    pub value: U256,
}

/// Probe `contract` storage at every index in `indices` under both layout conventions and
/// return the first candidate whose value equals `oracle`. Indices are probed in iteration order.
///
/// Up to `concurrency` indices are read at once, but results are consumed in index order, so
/// the lowest matching index wins. Within one index the Standard key is checked first.
pub(crate) async fn scan<R, F>(
    reader: &R,
    contract: Address,
    indices: impl IntoIterator<Item = u64>,
    concurrency: usize,
    oracle: U256,
    key_for: F,
) -> Result<Option<SlotMatch>, SourceError>
where
    R: StorageReader + ?Sized,
    F: Fn(u64, LayoutConvention) -> B256,
{
    let probes = stream::iter(indices)
        .map(|index| {
            let keys = LayoutConvention::PROBE_ORDER.map(|layout| (layout, key_for(index, layout)));
            async move {
                let [(first, first_key), (second, second_key)] = keys;
                let (first_word, second_word) = futures_util::try_join!(
                    reader.read_storage(contract, first_key),
                    reader.read_storage(contract, second_key)
                )?;
                Ok::<_, SourceError>((
                    index,
                    [(first, decode_u256(first_word)), (second, decode_u256(second_word))],
                ))
            }
        })
        .buffered(concurrency.max(1));
    let mut probes = pin!(probes);

    while let Some((index, candidates)) = probes.try_next().await? {
        for (layout, value) in candidates {
            trace!(%contract, index, %layout, %value, "probed");
            if value == oracle {
                debug!(%contract, index, %layout, "storage matched oracle");
                return Ok(Some(SlotMatch { index, layout, value }));
            }
        }
    }
    Ok(None)
}
