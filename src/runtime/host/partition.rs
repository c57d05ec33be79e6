use super::super::NativeResult;
use crate::cl;

/// A device partition: the compute units of each sub-device and the property list it came from.
pub(super) struct Partition {
    pub(super) units: Vec<u32>,
    pub(super) properties: Vec<isize>,
}

/// Splits `compute_units` as requested by a zero terminated partition property list.
///
/// Equal partitions and partitions by counts are supported.
pub(super) fn partition(properties: &[isize], compute_units: u32) -> NativeResult<Partition> {
    let (&name, values) = properties.split_first().ok_or(cl::INVALID_VALUE)?;
    let (units, used) = match name {
        cl::DEVICE_PARTITION_EQUALLY => {
            let &per_device = values.first().ok_or(cl::INVALID_VALUE)?;
            let per_device = u32::try_from(per_device).map_err(|_| cl::INVALID_VALUE)?;
            if per_device == 0 {
                return Err(cl::INVALID_VALUE);
            }
            let count = compute_units / per_device;
            if count == 0 {
                return Err(cl::DEVICE_PARTITION_FAILED);
            }
            (vec![per_device; count as usize], 1)
        }
        cl::DEVICE_PARTITION_BY_COUNTS => {
            let end = values
                .iter()
                .position(|x| *x == cl::DEVICE_PARTITION_BY_COUNTS_LIST_END)
                .ok_or(cl::INVALID_VALUE)?;
            if end == 0 {
                return Err(cl::INVALID_VALUE);
            }
            let units = values[..end]
                .iter()
                .map(|x| u32::try_from(*x).map_err(|_| cl::INVALID_DEVICE_PARTITION_COUNT))
                .collect::<NativeResult<Vec<u32>>>()?;
            let total = units.iter().map(|x| u64::from(*x)).sum::<u64>();
            if units.len() > compute_units as usize || total > u64::from(compute_units) {
                return Err(cl::INVALID_DEVICE_PARTITION_COUNT);
            }
            (units, end + 1)
        }
        _ => return Err(cl::INVALID_VALUE),
    };
    if values.get(used) != Some(&0) {
        return Err(cl::INVALID_VALUE);
    }
    Ok(Partition {
        units,
        properties: properties[..used + 2].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equally() {
        let split = partition(&[cl::DEVICE_PARTITION_EQUALLY, 3, 0], 8).unwrap();
        assert_eq!(split.units, [3, 3]);
        assert_eq!(split.properties, [cl::DEVICE_PARTITION_EQUALLY, 3, 0]);
        assert_eq!(
            partition(&[cl::DEVICE_PARTITION_EQUALLY, 9, 0], 8).err(),
            Some(cl::DEVICE_PARTITION_FAILED)
        );
        assert_eq!(partition(&[cl::DEVICE_PARTITION_EQUALLY, 0, 0], 8).err(), Some(cl::INVALID_VALUE));
        assert_eq!(partition(&[cl::DEVICE_PARTITION_EQUALLY, 2], 8).err(), Some(cl::INVALID_VALUE));
    }

    #[test]
    fn by_counts() {
        let list = [
            cl::DEVICE_PARTITION_BY_COUNTS,
            1,
            2,
            cl::DEVICE_PARTITION_BY_COUNTS_LIST_END,
            0,
        ];
        let split = partition(&list, 4).unwrap();
        assert_eq!(split.units, [1, 2]);
        assert_eq!(split.properties, list);
        assert_eq!(partition(&list, 2).err(), Some(cl::INVALID_DEVICE_PARTITION_COUNT));
        assert_eq!(
            partition(&[cl::DEVICE_PARTITION_BY_COUNTS, 1, -1, 0, 0], 4).err(),
            Some(cl::INVALID_DEVICE_PARTITION_COUNT)
        );
        assert_eq!(
            partition(&[cl::DEVICE_PARTITION_BY_AFFINITY_DOMAIN, 1, 0], 4).err(),
            Some(cl::INVALID_VALUE)
        );
    }
}
