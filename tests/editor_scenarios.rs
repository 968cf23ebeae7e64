// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end editor behavior through the public library API.

use field_mapper::models::{FieldId, LatLng};
use field_mapper::services::editor::{EditorEvent, FieldEditor, PointerTarget, Propagation};
use field_mapper::services::geometry;
use field_mapper::services::{HandleRef, RingOwner};

const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 0.001), (0.001, 0.001), (0.001, 0.0)];

fn place(editor: &mut FieldEditor, points: &[(f64, f64)]) {
    for &(lat, lng) in points {
        let propagation = editor.handle(EditorEvent::Click {
            target: PointerTarget::Map,
            at: LatLng::new(lat, lng),
        });
        assert_eq!(propagation, Propagation::Stop);
    }
}

fn close(editor: &mut FieldEditor) {
    editor.handle(EditorEvent::DoubleClick {
        target: PointerTarget::Map,
        at: LatLng::new(0.0, 0.0),
    });
}

fn draw(editor: &mut FieldEditor, points: &[(f64, f64)]) -> FieldId {
    editor.start_drawing_new_field();
    place(editor, points);
    close(editor);
    editor.fields().map(|f| f.id()).max().unwrap()
}

fn active_vertices(editor: &FieldEditor) -> usize {
    let fields = editor
        .fields()
        .flat_map(|f| f.overlay().vertex_handles())
        .filter(|h| h.is_active)
        .count();
    let drawing = editor.drawing().map_or(0, |s| {
        s.overlay().vertex_handles().iter().filter(|h| h.is_active).count()
    });
    fields + drawing
}

#[test]
fn test_square_field() {
    let mut editor = FieldEditor::default();
    let id = draw(&mut editor, &SQUARE);
    let field = editor.field(id).unwrap();

    assert_eq!(field.ring().len(), 4);
    let expected = 4.0 * geometry::distance_meters(LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.001));
    assert!((field.metrics().perimeter_meters - expected).abs() < 1e-6);
    assert!(field.metrics().area_hectares > 0.0);

    // Closing point is implicit in storage and explicit in the rendered path.
    let path = field.path();
    assert_eq!(path.len(), 5);
    assert_eq!(&path[..4], field.ring());
    assert_eq!(path[4], path[0]);
    assert_eq!(field.overlay().edge_handles().len(), 4);
}

#[test]
fn test_incomplete_drawing_is_discarded() {
    let mut editor = FieldEditor::default();
    draw(&mut editor, &SQUARE);

    editor.start_drawing_new_field();
    place(&mut editor, &SQUARE[..2]);
    assert_eq!(editor.start_drawing_new_field(), None);

    assert_eq!(editor.field_count(), 1);
    assert!(editor.drawing().unwrap().is_empty());
}

#[test]
fn test_edge_drag_on_triangle() {
    let mut editor = FieldEditor::default();
    let id = draw(&mut editor, &SQUARE[..3]);
    editor.set_edit_mode(id, true).unwrap();
    let area_before = editor.field(id).unwrap().metrics().area_hectares;

    let target = PointerTarget::Handle {
        owner: RingOwner::Field(id),
        handle: HandleRef::Edge(0),
    };
    let path = [(-0.0001, 0.0005), (-0.0002, 0.0005), (-0.0003, 0.0005)];
    editor.handle(EditorEvent::DragStart {
        target,
        at: LatLng::new(0.0, 0.0005),
    });
    let mut areas = vec![area_before];
    for (lat, lng) in path {
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(lat, lng),
        });
        areas.push(editor.field(id).unwrap().metrics().area_hectares);
    }
    editor.handle(EditorEvent::DragEnd {
        target,
        at: LatLng::new(-0.0003, 0.0005),
    });

    let field = editor.field(id).unwrap();
    assert_eq!(field.ring().len(), 4);
    assert_eq!(field.overlay().edge_handles().len(), 4);
    assert!(areas.windows(2).all(|w| w[1] > w[0]), "areas {areas:?}");
}

#[test]
fn test_label_doubles_edge() {
    let mut editor = FieldEditor::default();
    let near = LatLng::new(27.3428, 75.7904);
    let id = draw(
        &mut editor,
        &[
            (27.3428, 75.7904),
            (27.34325, 75.7904),
            (27.34325, 75.791),
            (27.3428, 75.791),
        ],
    );
    editor.set_edit_mode(id, true).unwrap();
    let original = editor.field(id).unwrap().ring()[1];
    let label = editor.field(id).unwrap().overlay().edge_handles()[0].label.clone();
    assert_eq!(label.text(), "50m");

    editor.handle(EditorEvent::LabelCommit {
        owner: RingOwner::Field(id),
        edge: 0,
        value: "100".to_string(),
    });

    let far = editor.field(id).unwrap().ring()[1];
    assert!((geometry::distance_meters(near, far) - 100.0).abs() < 0.01);
    // Same bearing: still due north of the near endpoint.
    assert!((far.lng - near.lng).abs() < 1e-12);
    assert!(far.lat > original.lat);
}

#[test]
fn test_rescale_round_trip() {
    let mut editor = FieldEditor::default();
    let id = draw(&mut editor, &SQUARE);
    let ring = editor.field(id).unwrap().ring().to_vec();
    let d = geometry::distance_meters(ring[1], ring[2]);

    let same = editor.set_field_edge_length(id, 1, d).unwrap();
    assert!((same.lat - ring[2].lat).abs() < 1e-9);
    assert!((same.lng - ring[2].lng).abs() < 1e-9);

    editor.set_field_edge_length(id, 1, 2.0 * d).unwrap();
    let back = editor.set_field_edge_length(id, 1, d).unwrap();
    assert!((back.lat - ring[2].lat).abs() < 1e-9);
    assert!((back.lng - ring[2].lng).abs() < 1e-9);
}

#[test]
fn test_area_is_idempotent() {
    let ring: Vec<LatLng> = SQUARE.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect();
    assert_eq!(geometry::area_hectares(&ring), geometry::area_hectares(&ring));
}

#[test]
fn test_one_active_vertex_and_one_editing_field() {
    let mut editor = FieldEditor::default();
    let a = draw(&mut editor, &SQUARE);
    let shifted: Vec<_> = SQUARE.iter().map(|&(lat, lng)| (lat, lng + 0.01)).collect();
    let b = draw(&mut editor, &shifted);

    editor.set_edit_mode(a, true).unwrap();
    for index in 0..4 {
        editor.handle(EditorEvent::Click {
            target: PointerTarget::Handle {
                owner: RingOwner::Field(a),
                handle: HandleRef::Vertex(index),
            },
            at: LatLng::new(SQUARE[index].0, SQUARE[index].1),
        });
        assert_eq!(active_vertices(&editor), 1);
    }

    editor.set_edit_mode(b, true).unwrap();
    assert!(!editor.field(a).unwrap().is_editing());
    assert!(!editor.field(a).unwrap().overlay().is_attached());
    assert!(editor.field(b).unwrap().overlay().is_attached());
    assert_eq!(active_vertices(&editor), 0);

    // Stale drag on the field that lost focus changes nothing.
    let before = editor.field(a).unwrap().ring().to_vec();
    editor.handle(EditorEvent::Drag {
        target: PointerTarget::Handle {
            owner: RingOwner::Field(a),
            handle: HandleRef::Vertex(0),
        },
        at: LatLng::new(-0.01, -0.01),
    });
    assert_eq!(editor.field(a).unwrap().ring(), &before[..]);
}
