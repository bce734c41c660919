//! Turns a decoded `PrimitiveBlock` into an ordered `Batch` of owned
//! entities: string-table resolution, tag filtering, delta reversal,
//! coordinate conversion and dense metadata unpacking all happen here.

use delta_encoding::DeltaDecoderExt;
use log::trace;

use crate::block::BlockContext;
use crate::elements::{Batch, Entity, Info, Member, MemberType, Node, Relation, Way};
use crate::error::{new_error, ErrorKind, Result};
use crate::filter::{build_tags, TagFilterSet};
use crate::proto::osmformat;

/// Reconstructs the entities of one inflated `PrimitiveBlock`, applying
/// `filters` and `with_info` to every group it contains.
pub(crate) fn reconstruct_block(
    block: &osmformat::PrimitiveBlock,
    filters: &TagFilterSet,
    with_info: bool,
) -> Result<Batch> {
    let ctx = BlockContext::new(block)?;

    let estimated = block
        .primitivegroup
        .iter()
        .map(|group| {
            group.nodes.len()
                + group.dense.as_ref().map_or(0, |d| d.id.len())
                + group.ways.len()
                + group.relations.len()
        })
        .sum();
    let mut batch = Batch::with_capacity(estimated);

    for group in &block.primitivegroup {
        if !group.changesets.is_empty() {
            return Err(new_error(ErrorKind::ChangesetsNotImplemented));
        }

        for osmnode in &group.nodes {
            batch.push(Entity::Node(reconstruct_node(
                &ctx, osmnode, &filters.node, with_info,
            )?));
        }

        if let Some(dense) = group.dense.as_ref() {
            reconstruct_dense(&ctx, dense, &filters.node, with_info, &mut batch)?;
        }

        for osmway in &group.ways {
            batch.push(Entity::Way(reconstruct_way(
                &ctx, osmway, &filters.way, with_info,
            )?));
        }

        for osmrel in &group.relations {
            batch.push(Entity::Relation(reconstruct_relation(
                &ctx, osmrel, &filters.relation, with_info,
            )?));
        }
    }

    trace!("reconstructed block into batch of {} entities", batch.len());
    Ok(batch)
}

fn reconstruct_info(
    ctx: &BlockContext,
    info: &osmformat::Info,
    with_info: bool,
) -> Result<Option<Info>> {
    if !with_info {
        return Ok(None);
    }

    let user = if info.has_user_sid() && info.user_sid() != 0 {
        Some(ctx.string(info.user_sid() as usize)?.to_owned())
    } else {
        None
    };

    let built = Info {
        version: info.version.filter(|&v| v != 0),
        timestamp: info
            .timestamp
            .filter(|&t| t != 0)
            .map(|t| ctx.milli_timestamp(t)),
        changeset: info.changeset.filter(|&c| c != 0),
        uid: info.uid.filter(|&u| u != 0),
        user,
        visible: info.visible.filter(|&v| !v),
    };

    Ok(built.non_empty())
}

fn reconstruct_node(
    ctx: &BlockContext,
    osmnode: &osmformat::Node,
    filter: &crate::filter::TagFilter,
    with_info: bool,
) -> Result<Node> {
    let tags = build_tags(&osmnode.keys, &osmnode.vals, filter, |i| ctx.string(i))?;
    let info = reconstruct_info(ctx, osmnode.info.get_or_default(), with_info)?;

    Ok(Node {
        id: osmnode.id(),
        lat: ctx.lat(osmnode.lat()),
        lon: ctx.lon(osmnode.lon()),
        tags,
        info,
    })
}

fn reconstruct_way(
    ctx: &BlockContext,
    osmway: &osmformat::Way,
    filter: &crate::filter::TagFilter,
    with_info: bool,
) -> Result<Way> {
    let tags = build_tags(&osmway.keys, &osmway.vals, filter, |i| ctx.string(i))?;
    let info = reconstruct_info(ctx, osmway.info.get_or_default(), with_info)?;

    let mut refs = Vec::with_capacity(osmway.refs.len());
    let mut current = 0i64;
    for &delta in &osmway.refs {
        current += delta;
        refs.push(current);
    }

    Ok(Way {
        id: osmway.id(),
        refs,
        tags,
        info,
    })
}

fn reconstruct_relation(
    ctx: &BlockContext,
    osmrel: &osmformat::Relation,
    filter: &crate::filter::TagFilter,
    with_info: bool,
) -> Result<Relation> {
    if osmrel.memids.len() != osmrel.types.len() || osmrel.memids.len() != osmrel.roles_sid.len() {
        return Err(new_error(ErrorKind::ParallelArrayMismatch(format!(
            "relation {} has memids/types/roles_sid of lengths {}/{}/{}",
            osmrel.id(),
            osmrel.memids.len(),
            osmrel.types.len(),
            osmrel.roles_sid.len()
        ))));
    }

    let tags = build_tags(&osmrel.keys, &osmrel.vals, filter, |i| ctx.string(i))?;
    let info = reconstruct_info(ctx, osmrel.info.get_or_default(), with_info)?;

    let mut members = Vec::with_capacity(osmrel.memids.len());
    let mut current_id = 0i64;
    for ((&delta, member_type), &role_sid) in osmrel
        .memids
        .iter()
        .zip(osmrel.types.iter())
        .zip(osmrel.roles_sid.iter())
    {
        current_id += delta;
        let role = ctx.string(role_sid as usize)?.to_owned();
        members.push(Member {
            member_type: member_type_from_proto(*member_type)?,
            member_id: current_id,
            role,
        });
    }

    Ok(Relation {
        id: osmrel.id(),
        members,
        tags,
        info,
    })
}

fn member_type_from_proto(
    raw: protobuf::EnumOrUnknown<osmformat::relation::MemberType>,
) -> Result<MemberType> {
    match raw.enum_value() {
        Ok(osmformat::relation::MemberType::NODE) => Ok(MemberType::Node),
        Ok(osmformat::relation::MemberType::WAY) => Ok(MemberType::Way),
        Ok(osmformat::relation::MemberType::RELATION) => Ok(MemberType::Relation),
        Err(unknown) => Err(new_error(ErrorKind::Format(format!(
            "unknown relation member type code {unknown}"
        )))),
    }
}

fn reconstruct_dense(
    ctx: &BlockContext,
    dense: &osmformat::DenseNodes,
    filter: &crate::filter::TagFilter,
    with_info: bool,
    batch: &mut Batch,
) -> Result<()> {
    if dense.lat.len() != dense.id.len() || dense.lon.len() != dense.id.len() {
        return Err(new_error(ErrorKind::ParallelArrayMismatch(format!(
            "dense nodes id/lat/lon lengths {}/{}/{}",
            dense.id.len(),
            dense.lat.len(),
            dense.lon.len()
        ))));
    }

    let denseinfo = dense.denseinfo.as_ref();
    if with_info {
        if let Some(info) = denseinfo {
            if !info.version.is_empty() && info.version.len() != dense.id.len() {
                return Err(new_error(ErrorKind::ParallelArrayMismatch(
                    "dense info version array length mismatch".to_owned(),
                )));
            }
        }
    }

    let ids = dense.id.iter().copied().original();
    let lats = dense.lat.iter().copied().original();
    let lons = dense.lon.iter().copied().original();

    let mut timestamps = denseinfo.map(|info| info.timestamp.iter().copied().original());
    let mut changesets = denseinfo.map(|info| info.changeset.iter().copied().original());
    let mut uids = denseinfo.map(|info| info.uid.iter().copied().original());
    let mut user_sids = denseinfo.map(|info| info.user_sid.iter().copied().original());
    let mut versions = denseinfo.map(|info| info.version.iter());
    let mut visibles = denseinfo.map(|info| info.visible.iter());

    let mut keys_vals_cursor = 0usize;
    let keys_vals = dense.keys_vals.as_slice();

    for (id, lat, lon) in ids.zip(lats).zip(lons).map(|((i, a), o)| (i, a, o)) {
        let mut tags: Vec<(String, String)> = Vec::new();
        if !matches!(filter, crate::filter::TagFilter::None) && !keys_vals.is_empty() {
            loop {
                match keys_vals.get(keys_vals_cursor) {
                    None | Some(0) => {
                        keys_vals_cursor += 1;
                        break;
                    }
                    Some(&key_idx) => {
                        let val_idx = *keys_vals.get(keys_vals_cursor + 1).ok_or_else(|| {
                            new_error(ErrorKind::ParallelArrayMismatch(
                                "dense keys_vals ended mid key/value pair".to_owned(),
                            ))
                        })?;
                        keys_vals_cursor += 2;
                        let key = ctx.string(key_idx as usize)?;
                        if filter.keep(key) {
                            let val = ctx.string(val_idx as usize)?;
                            tags.push((key.to_owned(), val.to_owned()));
                        }
                    }
                }
            }
        }

        let info = if with_info && denseinfo.is_some() {
            let version = versions.as_mut().and_then(|it| it.next()).copied();
            let timestamp = timestamps.as_mut().and_then(|it| it.next());
            let changeset = changesets.as_mut().and_then(|it| it.next());
            let uid = uids.as_mut().and_then(|it| it.next());
            let user_sid = user_sids.as_mut().and_then(|it| it.next());
            let visible = visibles
                .as_mut()
                .and_then(|it| it.next())
                .copied()
                .unwrap_or(true);

            let user = match user_sid {
                Some(sid) if sid != 0 => Some(ctx.string(sid as usize)?.to_owned()),
                _ => None,
            };

            let built = Info {
                version: version.filter(|&v| v != 0),
                timestamp: timestamp.filter(|&t| t != 0).map(|t| ctx.milli_timestamp(t)),
                changeset: changeset.filter(|&c| c != 0),
                uid: uid.filter(|&u| u != 0),
                user,
                visible: Some(visible).filter(|v| !v),
            };

            built.non_empty()
        } else {
            None
        };

        batch.push(Entity::Node(Node {
            id,
            lat: ctx.lat(lat),
            lon: ctx.lon(lon),
            tags: if tags.is_empty() { None } else { Some(tags) },
            info,
        }));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn block(granularity: Option<i32>, lat_offset: Option<i64>, lon_offset: Option<i64>) -> osmformat::PrimitiveBlock {
        let mut block = osmformat::PrimitiveBlock::new();
        block.granularity = granularity;
        block.lat_offset = lat_offset;
        block.lon_offset = lon_offset;
        block
    }

    #[test]
    fn coordinate_formula_matches_granularity_100() {
        let b = block(Some(100), Some(0), Some(0));
        let ctx = BlockContext::new(&b).unwrap();
        let lat = ctx.lat(330_000_000);
        assert_approx_eq!(lat, 33.0, 1e-9);
    }

    #[test]
    fn coordinate_formula_default_granularity() {
        let b = block(None, None, None);
        let ctx = BlockContext::new(&b).unwrap();
        let lat = ctx.lat(330_000_000);
        assert_approx_eq!(lat, 33.0, 1e-9);
    }

    #[test]
    fn dense_node_delta_reversal() {
        let mut dense = osmformat::DenseNodes::new();
        dense.id = vec![10, 5, -3];
        dense.lat = vec![0, 0, 0];
        dense.lon = vec![0, 0, 0];

        let b = block(Some(100), Some(0), Some(0));
        let ctx = BlockContext::new(&b).unwrap();
        let mut batch = Batch::new();
        reconstruct_dense(&ctx, &dense, &crate::filter::TagFilter::All, false, &mut batch).unwrap();

        let ids: Vec<i64> = batch
            .entities()
            .iter()
            .map(|e| match e {
                Entity::Node(n) => n.id,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![10, 15, 12]);
    }

    #[test]
    fn relation_member_reconstruction() {
        let mut rel = osmformat::Relation::new();
        rel.memids = vec![5, 10, -2];
        rel.types = vec![
            protobuf::EnumOrUnknown::new(osmformat::relation::MemberType::NODE),
            protobuf::EnumOrUnknown::new(osmformat::relation::MemberType::WAY),
            protobuf::EnumOrUnknown::new(osmformat::relation::MemberType::RELATION),
        ];
        rel.roles_sid = vec![1, 2, 1];

        let mut b = block(Some(100), Some(0), Some(0));
        b.stringtable.s = vec![b"".to_vec(), b"from".to_vec(), b"to".to_vec()];
        let ctx = BlockContext::new(&b).unwrap();

        let reconstructed = reconstruct_relation(&ctx, &rel, &crate::filter::TagFilter::All, false).unwrap();
        let expected = vec![
            (MemberType::Node, 5, "from"),
            (MemberType::Way, 15, "to"),
            (MemberType::Relation, 13, "from"),
        ];
        for (member, (kind, id, role)) in reconstructed.members.iter().zip(expected) {
            assert_eq!(member.member_type, kind);
            assert_eq!(member.member_id, id);
            assert_eq!(member.role, role);
        }
    }

    #[test]
    fn with_info_false_never_emits_info() {
        let mut osmnode = osmformat::Node::new();
        osmnode.id = Some(1);
        let mut info = osmformat::Info::new();
        info.version = Some(3);
        osmnode.info = Some(info).into();

        let b = block(Some(100), Some(0), Some(0));
        let ctx = BlockContext::new(&b).unwrap();
        let node = reconstruct_node(&ctx, &osmnode, &crate::filter::TagFilter::All, false).unwrap();
        assert!(node.info.is_none());
    }

    #[test]
    fn with_info_true_omits_zero_valued_fields() {
        let mut osmnode = osmformat::Node::new();
        osmnode.id = Some(1);
        let mut info = osmformat::Info::new();
        info.version = Some(0);
        info.timestamp = Some(0);
        info.changeset = Some(0);
        info.uid = Some(0);
        info.user_sid = Some(0);
        info.visible = Some(true);
        osmnode.info = Some(info).into();

        let b = block(Some(100), Some(0), Some(0));
        let ctx = BlockContext::new(&b).unwrap();
        let node = reconstruct_node(&ctx, &osmnode, &crate::filter::TagFilter::All, true).unwrap();

        // Every field was either zero-valued or `visible=true` (the default),
        // so the whole `Info` is omitted per the "info present only if at
        // least one field survives" rule.
        assert!(node.info.is_none());
    }

    #[test]
    fn with_info_true_keeps_surviving_fields_and_converts_timestamp() {
        let mut osmnode = osmformat::Node::new();
        osmnode.id = Some(1);
        let mut info = osmformat::Info::new();
        info.version = Some(4);
        info.timestamp = Some(12345);
        info.changeset = Some(0);
        info.uid = Some(0);
        info.visible = Some(false);
        osmnode.info = Some(info).into();

        let mut b = block(Some(100), Some(0), Some(0));
        b.date_granularity = Some(1000);
        let ctx = BlockContext::new(&b).unwrap();
        let node = reconstruct_node(&ctx, &osmnode, &crate::filter::TagFilter::All, true).unwrap();

        let info = node.info.expect("info should survive: version/timestamp/visible are set");
        assert_eq!(info.version, Some(4));
        assert_eq!(info.timestamp, Some(12_345_000));
        assert_eq!(info.changeset, None);
        assert_eq!(info.uid, None);
        assert_eq!(info.visible, Some(false));
    }

    #[test]
    fn dense_info_visible_defaults_to_true_when_array_missing() {
        let mut dense = osmformat::DenseNodes::new();
        dense.id = vec![1];
        dense.lat = vec![0];
        dense.lon = vec![0];

        let mut denseinfo = osmformat::DenseInfo::new();
        denseinfo.version = vec![2];
        denseinfo.timestamp = vec![5];
        denseinfo.changeset = vec![0];
        denseinfo.uid = vec![0];
        denseinfo.user_sid = vec![0];
        // `visible` left empty: must be treated as all-true, so no `visible`
        // field should survive into the emitted `Info`.
        dense.denseinfo = Some(denseinfo).into();

        let b = block(Some(100), Some(0), Some(0));
        let ctx = BlockContext::new(&b).unwrap();
        let mut batch = Batch::new();
        reconstruct_dense(&ctx, &dense, &crate::filter::TagFilter::All, true, &mut batch).unwrap();

        let info = match &batch.entities()[0] {
            Entity::Node(n) => n.info.clone().expect("version/timestamp survive"),
            _ => unreachable!(),
        };
        assert_eq!(info.version, Some(2));
        assert_eq!(info.timestamp, Some(5000));
        assert_eq!(info.visible, None);
    }

    #[test]
    fn changeset_group_is_rejected() {
        let mut group = osmformat::PrimitiveGroup::new();
        group.changesets.push(osmformat::ChangeSet::new());
        let mut b = block(Some(100), Some(0), Some(0));
        b.primitivegroup.push(group);

        let filters = TagFilterSet {
            node: crate::filter::TagFilter::All,
            way: crate::filter::TagFilter::All,
            relation: crate::filter::TagFilter::All,
        };
        let err = reconstruct_block(&b, &filters, false).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ChangesetsNotImplemented));
    }
}
