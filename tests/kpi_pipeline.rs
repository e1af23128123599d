use pretty_assertions::assert_eq;
use serde_json::json;
use vitals_kpi::schema::CachedValue;
use vitals_kpi::{compute_kpis, extract_xml, KpiConfig, KpiEncoder, KpiError, KpiProcessor, Metric};

const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE HealthData [
<!ELEMENT HealthData (Record*)>
]>
<HealthData locale="en_US">
 <ExportDate value="2024-02-02 10:00:00 +0000"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2024-01-30 08:00:00 +0000" endDate="2024-01-30 08:00:00 +0000" value="100">
  <MetadataEntry key="HKMetadataKeyHeartRateMotionContext" value="0"/>
 </Record>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2024-01-31 08:00:00 +0000" endDate="2024-01-31 08:00:00 +0000" value="150"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2024-02-01 08:00:00 +0000" endDate="2024-02-01 08:00:00 +0000" value="75"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="not a date" endDate="not a date" value="500"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Phone" unit="count" startDate="2024-01-30 09:00:00 +0000" endDate="2024-01-30 09:10:00 +0000" value="1200"/>
</HealthData>"#;

#[test]
fn heart_rate_export_end_to_end() {
    let table = extract_xml(EXPORT.as_bytes(), &KpiConfig::default()).unwrap();

    // Metadata entries stay nested inside their record
    assert_eq!(table.len(), 5);
    assert!(table.has_column("MetadataEntry"));

    let kpis = compute_kpis(&table, Metric::HeartRate.identifier()).unwrap();
    let encoded = KpiEncoder::encode(&kpis);

    assert_eq!(
        encoded["data"]["daily_avg"],
        json!([
            {"day": "2024-01-30", "daily_avg": 100.0, "evolution": 0.0},
            {"day": "2024-01-31", "daily_avg": 150.0, "evolution": 50.0},
            {"day": "2024-02-01", "daily_avg": 75.0, "evolution": -50.0},
        ])
    );
    assert_eq!(
        encoded["data"]["monthly_avg"],
        json!([
            {"month": "2024-01", "monthly_avg": 125.0},
            {"month": "2024-02", "monthly_avg": 75.0},
        ])
    );
    assert_eq!(encoded["data"]["weekly_avg"][0]["week"], "2024-W05");
    assert_eq!(encoded["data"]["overall_avg_ev"], 0.0);

    let overall = kpis.overall_avg.unwrap();
    assert!((overall - 325.0 / 3.0).abs() < 1e-9);
}

#[test]
fn processor_serves_several_metrics_from_one_upload() {
    let processor = KpiProcessor::new();
    processor.ingest_xml("export.xml", EXPORT.as_bytes()).unwrap();

    let steps = processor.kpis("export.xml", Metric::StepCount.identifier()).unwrap();
    assert_eq!(steps.daily_avg.averages(), vec![Some(1200.0)]);

    let report = processor.scores("export.xml").unwrap();
    assert!(report.heart.is_some());
    assert!(report.energy.is_none());

    let missing = processor.kpis("export.xml", Metric::Vo2Max.identifier());
    assert!(matches!(missing, Err(KpiError::EmptyResult(_))));

    processor.clear();
    assert!(processor.cache().is_empty());
}

#[test]
fn cached_columns_match_extracted_records() {
    let cached = CachedValue::from_json(json!({
        "type": [
            "HKQuantityTypeIdentifierRespiratoryRate",
            "HKQuantityTypeIdentifierRespiratoryRate"
        ],
        "startDate": ["2024-01-30 01:00:00 +0000", "2024-01-31 01:00:00 +0000"],
        "value": ["14", "16"]
    }))
    .unwrap();

    let table = cached.into_table().unwrap();
    let kpis = compute_kpis(&table, Metric::RespiratoryRate.identifier()).unwrap();

    assert_eq!(kpis.daily_avg.averages(), vec![Some(14.0), Some(16.0)]);
    assert_eq!(kpis.overall_avg, Some(15.0));
}
